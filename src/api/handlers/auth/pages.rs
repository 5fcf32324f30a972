//! Minimal self-contained HTML pages.

use axum::{
    http::{StatusCode, header::LOCATION},
    response::{Html, IntoResponse, Response},
};

pub(super) fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        title = html_escape(title),
    ))
}

/// Script shared by both forms: post urlencoded, follow `redirect_to`, show `message` on error.
const SUBMIT_SCRIPT: &str = r#"<script>
document.querySelectorAll("form[data-api]").forEach(function (form) {
  form.addEventListener("submit", function (event) {
    event.preventDefault();
    var data = new URLSearchParams(new FormData(form));
    if (event.submitter && event.submitter.name) {
      data.set(event.submitter.name, event.submitter.value);
    }
    fetch(form.dataset.api, { method: "POST", body: data })
      .then(function (res) { return res.json().then(function (body) { return [res.ok, body]; }); })
      .then(function (result) {
        if (result[0] && result[1].redirect_to) {
          window.location.href = result[1].redirect_to;
        } else {
          document.getElementById("error").textContent = result[1].message || "Request failed";
        }
      })
      .catch(function () { document.getElementById("error").textContent = "Request failed"; });
  });
});
</script>"#;

pub(super) fn login_page(challenge: &str, action: &str, client_name: &str) -> Html<String> {
    let heading = if client_name.is_empty() {
        "Sign in".to_string()
    } else {
        format!("Sign in to {}", html_escape(client_name))
    };
    let body = format!(
        r#"<h1>{heading}</h1>
<p id="error" role="alert"></p>
<form data-api="{action}">
<input type="hidden" name="challenge" value="{challenge}">
<label>Username <input name="username" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<label><input type="checkbox" name="remember"> Remember me</label>
<button type="submit">Sign in</button>
</form>
{SUBMIT_SCRIPT}"#,
        action = html_escape(action),
        challenge = html_escape(challenge),
    );
    layout("Sign in", &body)
}

pub(super) fn consent_page(
    challenge: &str,
    action: &str,
    client_name: &str,
    scopes: &[String],
) -> Html<String> {
    let scope_items: String = scopes
        .iter()
        .map(|scope| {
            let scope = html_escape(scope);
            format!(
                r#"<li><label><input type="checkbox" class="scope" value="{scope}" checked> {scope}</label></li>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let body = format!(
        r#"<h1>Authorize {client}</h1>
<p id="error" role="alert"></p>
<form data-api="{action}">
<input type="hidden" name="challenge" value="{challenge}">
<input type="hidden" name="grant_scope" value="">
<p>{client} is requesting access to:</p>
<ul>
{scope_items}
</ul>
<label><input type="checkbox" name="remember"> Remember this decision</label>
<button type="submit" name="accept" value="true">Allow</button>
<button type="submit" name="accept" value="false">Deny</button>
</form>
<script>
document.querySelector("form[data-api]").addEventListener("submit", function (event) {{
  var chosen = Array.from(document.querySelectorAll("input.scope:checked")).map(function (el) {{ return el.value; }});
  event.target.querySelector("input[name=grant_scope]").value = chosen.join(" ");
}}, true);
</script>
{SUBMIT_SCRIPT}"#,
        client = html_escape(client_name),
        action = html_escape(action),
        challenge = html_escape(challenge),
    );
    layout("Authorize", &body)
}

pub(super) fn message_page(status: StatusCode, title: &str, message: &str) -> Response {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        html_escape(title),
        html_escape(message)
    );
    (status, layout(title, &body)).into_response()
}

pub(super) fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}
