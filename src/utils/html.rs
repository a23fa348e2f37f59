use ammonia;

/// Clean admin-supplied text (track titles, descriptions, test titles) with
/// ammonia before it is stored.
///
/// Safe inline tags survive; `<script>`, `<iframe>` and event-handler
/// attributes are removed together with script content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_text() {
        assert_eq!(clean_html("Intro<script>alert(1)</script>"), "Intro");
        assert_eq!(clean_html("Plain title"), "Plain title");
    }
}
