use marquee_common::Recommendations;

use crate::suggest::Suggestion;

const START_TYPING: &str = "Start typing to see suggestions...";

/// Render the search page. `query` is what the user typed, if anything.
pub fn render_index(query: Option<&str>, suggestions: &[Suggestion]) -> String {
    let value = html_escape(query.unwrap_or(""));

    let body = if suggestions.is_empty() {
        format!(r#"<p class="info">{START_TYPING}</p>"#)
    } else {
        let options: String = suggestions
            .iter()
            .map(|s| {
                format!(
                    r#"<option value="{v}">{t}</option>"#,
                    v = html_escape(&s.title),
                    t = html_escape(&s.title),
                )
            })
            .collect();
        format!(
            r#"<form action="/recommend" method="get" class="pick">
    <label for="title">Did you mean:</label>
    <select id="title" name="title">{options}</select>
    <button type="submit">Recommend</button>
</form>"#
        )
    };

    let content = format!(
        r#"<div class="container">
<form action="/" method="get" class="search">
    <label for="q">Enter movie title:</label>
    <input id="q" name="q" type="text" value="{value}" autofocus>
</form>
{body}
</div>"#
    );

    build_page("Movie Recommender", &content)
}

/// Render the four recommendation sections for one title.
pub fn render_recommendations(recs: &Recommendations) -> String {
    let genre: Vec<String> = recs
        .by_genre
        .iter()
        .map(|r| {
            panel(
                &format!("{} - Rating: {}", r.title, rating(r.rating)),
                Some(("Shared Genres", r.shared_genres.join(", "))),
                &r.overview,
            )
        })
        .collect();

    let people: Vec<String> = recs
        .by_people
        .iter()
        .map(|r| {
            panel(
                &format!("{} - Rating: {}", r.title, rating(r.rating)),
                Some(("Shared People", r.shared_people.join(", "))),
                &r.overview,
            )
        })
        .collect();

    let community: Vec<String> = recs
        .by_community
        .iter()
        .map(|r| panel(&format!("{} - Rating: {}", r.title, rating(r.rating)), None, &r.overview))
        .collect();

    let plot: Vec<String> = recs
        .by_plot
        .iter()
        .map(|r| panel(&format!("{} - Score: {:.2}", r.title, r.score), None, &r.overview))
        .collect();

    let content = format!(
        r#"<div class="container">
<p class="back"><a href="/">&larr; New search</a></p>
<h2>Recommendations for {title}</h2>
{genre}
{people}
{community}
{plot}
</div>"#,
        title = html_escape(&recs.title),
        genre = section("Top 5 by Shared Genres", &genre),
        people = section("Top 5 by Shared Director/Stars", &people),
        community = section("Community Recommendations", &community),
        plot = section("Top 5 by Plot Similarity", &plot),
    );

    build_page(&recs.title, &content)
}

pub fn render_error(message: &str) -> String {
    let content = format!(
        r#"<div class="container"><p class="error">{}</p><p class="back"><a href="/">&larr; Back</a></p></div>"#,
        html_escape(message)
    );
    build_page("Error", &content)
}

// --- Helpers ---

fn section(heading: &str, panels: &[String]) -> String {
    let inner = if panels.is_empty() {
        r#"<p class="empty">No matches.</p>"#.to_string()
    } else {
        panels.concat()
    };
    format!("<section><h3>{}</h3>{inner}</section>", html_escape(heading))
}

fn panel(summary: &str, reason: Option<(&str, String)>, overview: &str) -> String {
    let reason = reason
        .map(|(label, value)| {
            format!(
                "<p><strong>{}:</strong> {}</p>",
                html_escape(label),
                html_escape(&value)
            )
        })
        .unwrap_or_default();
    format!(
        "<details><summary>{}</summary>{reason}<p>{}</p></details>",
        html_escape(summary),
        html_escape(overview)
    )
}

fn rating(r: Option<f64>) -> String {
    r.map(|v| format!("{v:.1}")).unwrap_or_else(|| "N/A".to_string())
}

fn build_page(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Marquee</title>
<style>
*{{margin:0;padding:0;box-sizing:border-box;}}
body{{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;color:#1a1a1a;background:#fafafa;}}
.header{{background:#1a1a1a;color:#fff;padding:12px 24px;}}
.header h1{{font-size:18px;font-weight:600;}}
.header a{{color:#fff;text-decoration:none;}}
.container{{max-width:960px;margin:0 auto;padding:24px;}}
form{{margin-bottom:16px;}}
label{{display:block;font-size:14px;color:#555;margin-bottom:6px;}}
input[type=text],select{{width:100%;padding:8px;font-size:15px;border:1px solid #ccc;border-radius:4px;margin-bottom:8px;}}
button{{padding:6px 16px;background:#0066cc;color:#fff;border:none;border-radius:4px;font-size:14px;cursor:pointer;}}
button:hover{{background:#004499;}}
h2{{margin-bottom:16px;}}
section{{margin-bottom:24px;}}
section h3{{font-size:16px;margin-bottom:8px;}}
details{{background:#fff;border:1px solid #e0e0e0;border-radius:8px;padding:12px 16px;margin-bottom:8px;}}
details summary{{cursor:pointer;font-weight:500;}}
details p{{color:#555;font-size:14px;margin-top:8px;}}
.info{{background:#e3f2fd;color:#1565c0;padding:10px 12px;border-radius:4px;font-size:14px;}}
.error{{background:#fce4ec;color:#c62828;padding:10px 12px;border-radius:4px;font-size:14px;margin-bottom:12px;}}
.empty{{color:#888;font-size:13px;}}
.back{{font-size:13px;margin-bottom:12px;}}
.back a{{color:#0066cc;text-decoration:none;}}
</style>
</head>
<body>
<div class="header"><h1><a href="/">Graph-Based Movie Recommender</a></h1></div>
{content}
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
