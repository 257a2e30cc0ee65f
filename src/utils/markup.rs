///////////////////////////////
/// Escape text for use in HTML or SVG, inside elements as well as quoted attributes
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping() {
        assert_eq!(escape_html("G>T <b> & \"x\""), "G&gt;T &lt;b&gt; &amp; &quot;x&quot;");
        assert_eq!(escape_html("5'"), "5&#39;");
    }
}
