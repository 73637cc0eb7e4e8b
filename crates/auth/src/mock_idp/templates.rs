//! HTML for the mock IdP.

/// Escape HTML special characters to prevent XSS.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Auto-submitting form that returns the response fields as a POST, the
/// way `response_mode=form_post` authorities do.
pub fn form_post_page(redirect_uri: &str, fields: &[(&str, String)]) -> String {
    let inputs: String = fields
        .iter()
        .map(|(name, value)| {
            format!(
                r#"        <input type="hidden" name="{}" value="{}" />
"#,
                html_escape(name),
                html_escape(value)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Redirecting...</title>
</head>
<body onload="document.forms[0].submit()">
    <form method="POST" action="{redirect_uri}">
{inputs}        <noscript>
            <p>JavaScript is disabled. Click the button below to continue.</p>
            <button type="submit">Continue</button>
        </noscript>
    </form>
</body>
</html>"#,
        redirect_uri = html_escape(redirect_uri),
    )
}

pub fn login_page(state: &str, nonce: &str, redirect_uri: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Mock Identity Provider (DEV ONLY)</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, sans-serif;
            max-width: 400px;
            margin: 100px auto;
            padding: 20px;
        }}
        .warning {{
            background: #fff3cd;
            border: 1px solid #ffc107;
            padding: 15px;
            border-radius: 8px;
            margin-bottom: 20px;
        }}
        form {{
            background: #f8f9fa;
            padding: 20px;
            border-radius: 8px;
        }}
        label {{
            display: block;
            margin-bottom: 5px;
            font-weight: 500;
        }}
        input[type="email"], input[type="text"] {{
            width: 100%;
            padding: 10px;
            margin-bottom: 15px;
            border: 1px solid #ced4da;
            border-radius: 4px;
            box-sizing: border-box;
        }}
        button {{
            width: 48%;
            padding: 12px;
            border: none;
            border-radius: 4px;
            cursor: pointer;
            font-size: 16px;
        }}
        button[value="allow"] {{ background: #007bff; color: white; }}
        button[value="deny"] {{ background: #dc3545; color: white; }}
    </style>
</head>
<body>
    <div class="warning">
        <p>This is a <strong>mock identity provider</strong> for development.</p>
        <p>Any email is accepted. Deny to test the consent failure path.</p>
    </div>

    <form action="/authorize/submit" method="POST">
        <input type="hidden" name="state" value="{state}" />
        <input type="hidden" name="nonce" value="{nonce}" />
        <input type="hidden" name="redirect_uri" value="{redirect_uri}" />

        <label for="email">Email Address</label>
        <input type="email" id="email" name="email" placeholder="dev@example.com" required />

        <label for="name">Name (optional)</label>
        <input type="text" id="name" name="name" placeholder="Dev User" />

        <label for="roles">Roles (comma separated)</label>
        <input type="text" id="roles" name="roles" placeholder="admin, reader" />

        <label><input type="checkbox" name="email_verified" checked /> Email verified</label>
        <label><input type="checkbox" name="form_post" /> Return with form POST</label>

        <button type="submit" name="decision" value="allow">Sign in</button>
        <button type="submit" name="decision" value="deny">Deny</button>
    </form>
</body>
</html>"#,
        state = html_escape(state),
        nonce = html_escape(nonce),
        redirect_uri = html_escape(redirect_uri),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_escapes_state() {
        let html = login_page(r#""><script>"#, "n", "http://localhost/signin-oidc");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }
}
