//! Minimal TwiML rendering for SMS replies.

/// Wraps `text` in a single-message TwiML response document.
pub fn message_response(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    )
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_text_in_message_element() {
        assert_eq!(
            message_response("Hi there"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>Hi there</Message></Response>"
        );
    }

    #[test]
    fn escapes_markup_characters() {
        let twiml = message_response("a < b & c > d");
        assert!(twiml.contains("a &lt; b &amp; c &gt; d"));
    }
}
