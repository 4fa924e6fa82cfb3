use super::OutgoingMail;

pub const WELCOME_SUBJECT: &str = "Welcome to UrbanSquare - Your Account Has Been Created";
pub const RESET_SUBJECT: &str = "Password Reset - UrbanSquare Security";

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn welcome(from: &str, to: &str, name: &str) -> OutgoingMail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Welcome to UrbanSquare, {name}!</h2>
  <p>Your account has been created successfully.</p>
  <p>You can now browse listings, save properties and get AI-powered insights on the market.</p>
  <p style="color: #6b7280; font-size: 12px;">If you did not create this account, please ignore this email.</p>
</div>"#,
        name = escape_html(name),
    );
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: WELCOME_SUBJECT.to_string(),
        html,
    }
}

pub fn password_reset(from: &str, to: &str, reset_url: &str) -> OutgoingMail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2563eb;">Reset your password</h2>
  <p>We received a request to reset the password for your UrbanSquare account.</p>
  <p><a href="{url}" style="background: #2563eb; color: #fff; padding: 10px 20px; text-decoration: none; border-radius: 4px;">Reset Password</a></p>
  <p>Or paste this link into your browser: {url}</p>
  <p>This link is valid for 10 minutes. If you did not request a reset, you can ignore this email.</p>
</div>"#,
        url = escape_html(reset_url),
    );
    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: RESET_SUBJECT.to_string(),
        html,
    }
}
