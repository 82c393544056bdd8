use bindery_xpath::consts::XML_NS;
use bindery_xpath::{NodeKind, parse_document};
use rstest::rstest;

#[rstest]
fn namespaces_resolve_in_scope() {
    let doc = parse_document(
        r#"<a xmlns="urn:default" xmlns:x="urn:x"><x:b x:flag="1" plain="2"/><c xml:lang="de"/></a>"#,
    )
    .unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(a.namespace_uri(), Some("urn:default"));
    let b = &a.children()[0];
    assert_eq!(b.namespace_uri(), Some("urn:x"));
    assert_eq!(b.attribute_ns(Some("urn:x"), "flag").unwrap().value(), "1");
    assert_eq!(b.attribute("plain").unwrap().namespace_uri(), None);
    let c = &a.children()[1];
    assert_eq!(c.attribute_ns(Some(XML_NS), "lang").unwrap().value(), "de");
}

#[rstest]
fn whitespace_only_text_is_dropped() {
    let doc = parse_document("<a>\n  <b> x </b>\n  <c/>\n</a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(a.children().len(), 2);
    assert_eq!(a.children()[0].string_value(), " x ");
}

#[rstest]
fn entities_and_cdata_are_text() {
    let doc = parse_document("<a>1 &lt; 2 &#38; <![CDATA[<ok>]]></a>").unwrap();
    let a = doc.document_element().unwrap();
    assert_eq!(a.children().len(), 1);
    assert_eq!(a.children()[0].kind(), NodeKind::Text);
    assert_eq!(a.string_value(), "1 < 2 & <ok>");
}

#[rstest]
#[case("")]
#[case("<a><b></a>")]
#[case("just text")]
fn malformed_documents_fail(#[case] source: &str) {
    assert!(parse_document(source).is_err());
}

#[rstest]
fn serialization_round_trips_structure() {
    let source = r#"<a id="1"><b>x &amp; y</b><c/></a>"#;
    let doc = parse_document(source).unwrap();
    let again = parse_document(&doc.to_xml()).unwrap();
    assert_eq!(again.document_element().unwrap().children().len(), 2);
    assert_eq!(again.document_element().unwrap().string_value(), "x & y");
}
