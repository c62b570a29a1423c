//! Server-rendered HTML pages.

use crate::error::RecommenderError;
use crate::models::RecommendationResponse;
use crate::utils::escape_html;
use crate::utils::validation::{MAX_RATING, MIN_RATING};

pub const APP_TITLE: &str = "Awesome Movie Recommender";
pub const FORM_PAIRS: usize = 5;

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{heading}</h1>\n{body}\n</body>\n</html>\n",
        title = APP_TITLE,
        heading = escape_html(heading),
        body = body,
    )
}

pub fn index_page() -> String {
    let mut rows = String::new();
    for i in 1..=FORM_PAIRS {
        rows.push_str(&format!(
            "<p>\n<label>Movie {i} <input type=\"text\" name=\"movie{i}\" required></label>\n\
             <label>Rating <input type=\"number\" name=\"rating{i}\" min=\"{min}\" max=\"{max}\" step=\"0.5\" required></label>\n</p>\n",
            i = i,
            min = MIN_RATING,
            max = MAX_RATING,
        ));
    }

    let form = format!(
        "<p>Rate five movies you have seen and get five new ones to watch.</p>\n\
         <form action=\"/recommender\" method=\"get\">\n{}<button type=\"submit\">Recommend</button>\n</form>",
        rows
    );
    layout(APP_TITLE, &form)
}

pub fn recommendations_page(response: &RecommendationResponse) -> String {
    let mut body = String::from("<ol>\n");
    for item in &response.recommendations {
        body.push_str(&format!("<li>{}</li>\n", escape_html(&item.title)));
    }
    body.push_str("</ol>\n");

    if !response.ignored_titles.is_empty() {
        let ignored: Vec<String> = response.ignored_titles.iter().map(|t| escape_html(t)).collect();
        body.push_str(&format!(
            "<p class=\"notice\">Not in our catalogue, ignored: {}</p>\n",
            ignored.join(", ")
        ));
    }

    body.push_str("<p><a href=\"/\">Try again</a></p>");
    layout("Your recommendations", &body)
}

pub fn error_page(error: &RecommenderError) -> String {
    let message = if error.status_code().is_server_error() {
        "Something went wrong while computing recommendations.".to_string()
    } else {
        error.to_string()
    };
    let body = format!(
        "<p class=\"error\">{}</p>\n<p><a href=\"/\">Back</a></p>",
        escape_html(&message)
    );
    layout("Sorry", &body)
}
