//! Minimal HTML pages for the browser-facing unsubscribe flow.

pub use worker::render::escape_html;

/// Wrap an already-escaped body fragment in a standalone page.
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
         <html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title></head>\
         <body style=\"font-family:Arial,Helvetica,sans-serif;max-width:560px;margin:48px auto;padding:0 16px;color:#1f2937\">\
         <h1 style=\"font-size:20px\">{title}</h1>{body}</body></html>",
        title = escape_html(title),
        body = body,
    )
}

/// Confirmation form that POSTs the token back.
pub fn unsubscribe_form(token: &str, description: &str) -> String {
    format!(
        "<p>Stop receiving {description}?</p>\
         <form method=\"post\" action=\"/unsubscribe?token={token}\">\
         <button type=\"submit\" style=\"padding:8px 16px\">Unsubscribe</button>\
         </form>",
        description = escape_html(description),
        token = escape_html(token),
    )
}
