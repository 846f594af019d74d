//! View tree behavior driven through the dev notation.

use weaver_view::dev::{ParseErrorKind, StringifyOptions, parse, stringify};
use weaver_view::{ElementKind, ViewElement, ViewNode, ViewPosition};

fn element(notation: &str) -> ViewElement {
    parse(notation).unwrap().view.as_element().unwrap().clone()
}

#[test]
fn test_filler_offsets_per_kind() {
    assert_eq!(element("<container:p></container:p>").filler_offset(), Some(0));
    assert_eq!(element("<container:p>foo</container:p>").filler_offset(), None);
    assert_eq!(
        element("<container:p>foo<empty:br></empty:br></container:p>").filler_offset(),
        Some(2)
    );
    assert_eq!(element("<p></p>").filler_offset(), None);
    assert_eq!(element("<empty:img></empty:img>").filler_offset(), None);

    let p = element("<container:p><attribute:b></attribute:b></container:p>");
    let b = p.child(0).unwrap();
    assert_eq!(p.filler_offset(), None);
    assert_eq!(b.as_element().unwrap().filler_offset(), Some(0));
}

#[test]
fn test_filler_offset_hook_overrides_default() {
    let p = element("<container:p>foo</container:p>");
    p.set_filler_offset_hook(|element| Some(element.child_count()));
    assert_eq!(p.filler_offset(), Some(1));
}

#[test]
fn test_ui_elements_render_in_notation() {
    let ui = ViewElement::ui("span", |writer| {
        writer.start_element("b");
        writer.text("x");
        writer.end_element();
    });
    let p = ViewElement::container("p")
        .with_children([ViewNode::from("a"), ui.as_node()])
        .unwrap();

    let options = StringifyOptions {
        show_type: true,
        render_ui_elements: true,
        ..Default::default()
    };
    insta::assert_snapshot!(
        stringify(&p.as_node(), None, &options),
        @"<container:p>a<ui:span><b>x</b></ui:span></container:p>"
    );
}

#[test]
fn test_positions_follow_tree_edits() {
    let parsed = parse("<container:p>foo<attribute:b>bar</attribute:b></container:p>").unwrap();
    let p = parsed.view.as_element().unwrap().clone();
    let b = p.child(1).unwrap();

    let before = ViewPosition::before(&b).unwrap();
    assert_eq!(before, ViewPosition::new(p.clone(), 1));
    assert_eq!(before.node_after(), Some(b.clone()));

    p.insert_child(0, ViewNode::from("x")).unwrap();
    assert_eq!(ViewPosition::before(&b).unwrap(), ViewPosition::new(p, 2));
}

#[test]
fn test_malformed_fixtures_fail() {
    let cases = [
        ("<foo:p></foo:p>", ParseErrorKind::UnknownNamespace("foo".into())),
        ("<p>fo}o</p>", ParseErrorKind::RangeEndWithoutStart('}')),
        ("<p>{f{o}o</p>", ParseErrorKind::NestedRangeStart('{')),
    ];
    for (notation, expected) in cases {
        let err = parse(notation).unwrap_err();
        assert_eq!(err.kind(), &expected, "{notation}");
    }
    assert_eq!(ElementKind::from_notation_type("foo"), None);
}
