use quick_xml::events::Event;
use quick_xml::Reader;

use crate::feed::{
    cache::Fragment,
    error::XmlError,
    item::FeedItem,
    variant::FeedVariant,
    xml::{has_control_characters, XmlWriter},
};

/// Serializes one item into its own buffer, so a failure leaves no partial
/// markup behind in the document.
pub fn render_fragment(variant: FeedVariant, item: &FeedItem) -> Result<Fragment, XmlError> {
    let mut xml = XmlWriter::new(Vec::new());
    xml.start("item", &variant.item_attributes())?;
    variant.write_item_elements(&mut xml, item)?;
    xml.end("item")?;
    let fragment = String::from_utf8(xml.into_inner())?;
    Ok(Fragment::from(fragment))
}

/// Checks that externally supplied bytes hold exactly one balanced `<item>`
/// element, so they can be copied into a document as they are.
pub fn check_fragment(fragment: &str) -> Result<(), XmlError> {
    if has_control_characters(fragment) {
        return Err(XmlError::ControlCharacters);
    }

    let mut reader = Reader::from_str(fragment);
    let mut depth = 0usize;
    let mut items = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if depth == 0 {
                    if e.name().as_ref() != b"item" {
                        return Err(XmlError::MalformedFragment("root element is not <item>"));
                    }
                    items += 1;
                }
                depth += 1;
            }
            Event::Empty(e) if depth == 0 => {
                if e.name().as_ref() != b"item" {
                    return Err(XmlError::MalformedFragment("root element is not <item>"));
                }
                items += 1;
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(XmlError::MalformedFragment("unexpected closing tag"));
                }
                depth -= 1;
            }
            Event::Text(text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(XmlError::MalformedFragment("text outside <item>"));
                }
            }
            Event::CData(_) | Event::Decl(_) | Event::DocType(_) | Event::PI(_) if depth == 0 => {
                return Err(XmlError::MalformedFragment("markup outside <item>"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match (depth, items) {
        (0, 1) => Ok(()),
        (0, _) => Err(XmlError::MalformedFragment("expected exactly one <item>")),
        _ => Err(XmlError::MalformedFragment("unclosed element")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn item() -> FeedItem {
        FeedItem {
            title: "Дача & <дом>".to_string(),
            link: "https://test.ru/dacha/?utm_source=rss".to_string(),
            description: Some("Кратко".to_string()),
            author_name: "Анна Кондрашова".to_string(),
            categories: vec!["Жилье".to_string(), "Дача".to_string()],
            pubdate: Some(Utc.with_ymd_and_hms(2022, 10, 4, 15, 20, 53).unwrap()),
            updateddate: None,
            content: Some("<p>a]]>b</p>".to_string()),
            guid: Some("f78112bd-eac6-4ee8-96ad-bac8d3d1f110".to_string()),
            slug: "dacha".to_string(),
        }
    }

    /// `(element, text)` pairs in document order; CDATA sections are joined.
    fn elements(xml: &str) -> Vec<(String, String)> {
        let mut reader = Reader::from_str(xml);
        let mut out: Vec<(String, String)> = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => {
                    let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                    out.push((name, String::new()));
                }
                Event::Text(t) => {
                    if let Some(last) = out.last_mut() {
                        last.1.push_str(&t.unescape().unwrap());
                    }
                }
                Event::CData(c) => {
                    if let Some(last) = out.last_mut() {
                        last.1.push_str(std::str::from_utf8(&c.into_inner()).unwrap());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    fn text_of<'a>(elements: &'a [(String, String)], name: &str) -> Vec<&'a str> {
        elements
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    #[test]
    fn test_turbo_fragment_round_trip() {
        let item = item();
        let fragment = render_fragment(FeedVariant::YandexTurbo, &item).unwrap();
        assert!(fragment.starts_with("<item turbo=\"true\">"));
        assert!(fragment.ends_with("</item>"));

        let parsed = elements(&fragment);
        assert_eq!(text_of(&parsed, "link"), vec![item.link.as_str()]);
        assert_eq!(text_of(&parsed, "author"), vec!["Анна Кондрашова"]);
        assert_eq!(text_of(&parsed, "category"), vec!["Жилье", "Дача"]);
        assert_eq!(text_of(&parsed, "turbo:extendedHtml"), vec!["true"]);
        assert_eq!(text_of(&parsed, "turbo:content"), vec!["<p>a]]>b</p>"]);

        let pubdate = DateTime::parse_from_rfc2822(text_of(&parsed, "pubDate")[0]).unwrap();
        assert_eq!(pubdate.timestamp(), item.pubdate.unwrap().timestamp());
    }

    #[test]
    fn test_generic_fragment_round_trip() {
        let item = item();
        let fragment = render_fragment(FeedVariant::Generic, &item).unwrap();
        assert!(fragment.starts_with("<item>"));
        assert!(!fragment.contains("turbo:content"));

        let parsed = elements(&fragment);
        assert_eq!(text_of(&parsed, "title"), vec!["Дача & <дом>"]);
        assert_eq!(text_of(&parsed, "dc:creator"), vec!["Анна Кондрашова"]);
        assert_eq!(text_of(&parsed, "guid"), vec!["f78112bd-eac6-4ee8-96ad-bac8d3d1f110"]);
        assert_eq!(text_of(&parsed, "description"), vec!["Кратко"]);
    }

    #[test]
    fn test_control_characters_fail_the_fragment() {
        let mut item = item();
        item.author_name = "bad\u{1}".to_string();
        assert!(matches!(
            render_fragment(FeedVariant::YandexTurbo, &item),
            Err(XmlError::ControlCharacters)
        ));
    }

    #[test]
    fn test_control_characters_in_content_fail_the_fragment() {
        let mut item = item();
        item.content = Some("<p>bad\u{1}text</p>".to_string());
        assert!(matches!(
            render_fragment(FeedVariant::YandexTurbo, &item),
            Err(XmlError::ControlCharacters)
        ));
    }

    #[test]
    fn test_rendered_fragments_pass_the_check() {
        for variant in [FeedVariant::Generic, FeedVariant::YandexTurbo] {
            let fragment = render_fragment(variant, &item()).unwrap();
            check_fragment(&fragment).unwrap();
        }
        check_fragment("\n<item turbo=\"true\"><link>x</link></item>\n").unwrap();
    }

    #[test]
    fn test_broken_fragments_are_rejected() {
        for fragment in [
            "<item turbo=\"true\"><link>x</link>",
            "<item></item><item></item>",
            "<entry></entry>",
            "stray<item></item>",
            "",
            "<item>bad\u{1}</item>",
        ] {
            assert!(check_fragment(fragment).is_err(), "accepted {fragment:?}");
        }
    }

    #[test]
    fn test_missing_content_keeps_empty_element() {
        let mut item = item();
        item.content = None;
        let fragment = render_fragment(FeedVariant::YandexTurbo, &item).unwrap();
        assert!(fragment.contains("<turbo:content></turbo:content>"));
    }
}
