use crate::nodes::NodeValue;
use crate::{format_document, markdown_to_html, parse_document, Options, Tree};

#[test]
fn parse_then_format_matches_convenience_wrapper() {
    let input = "# Heading\n\nSome *text* with a [link](/url).\n";
    let options = Options::default();

    let mut tree = Tree::new();
    let root = parse_document(&mut tree, input, &options);

    let mut output = vec![];
    format_document(&tree, root, &options, &mut output).unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        markdown_to_html(input, &options)
    );
}

#[test]
fn mutate_text_nodes_before_rendering() {
    let mut tree = Tree::new();
    let root = parse_document(
        &mut tree,
        "Hello, everyone!\n",
        &Options::default(),
    );

    let nodes: Vec<_> = tree.descendants(root).collect();
    for node in nodes {
        if let Some(text) = tree.ast_mut(node).value.text_mut() {
            *text = text.replace("everyone", "world");
        }
    }

    let mut output = vec![];
    format_document(&tree, root, &Options::default(), &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "<p>Hello, world!</p>\n");
}

#[test]
fn emphasis_sourcepos_spans_delimiters() {
    let mut tree = Tree::new();
    let root = parse_document(&mut tree, "hello *world*\n", &Options::default());

    let paragraph = tree.first_child(root).unwrap();
    let emph = tree
        .children(paragraph)
        .find(|&n| matches!(tree.ast(n).value, NodeValue::Emph))
        .unwrap();
    assert_eq!(tree.ast(emph).sourcepos, (1, 7, 1, 13).into());
}

#[test]
fn document_sourcepos_covers_all_lines() {
    let mut tree = Tree::new();
    let root = parse_document(&mut tree, "a\n\nb\nc\n", &Options::default());
    assert_eq!(tree.ast(root).sourcepos, (1, 1, 4, 1).into());
}

#[test]
fn detached_node_is_skipped_by_renderer() {
    let mut tree = Tree::new();
    let root = parse_document(&mut tree, "one\n\ntwo\n", &Options::default());

    let second = tree
        .children(root)
        .nth(1)
        .unwrap();
    tree.detach(second);

    let mut output = vec![];
    format_document(&tree, root, &Options::default(), &mut output).unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "<p>one</p>\n");
}

#[test]
fn options_are_cloneable_and_debuggable() {
    let mut options = Options::default();
    options.render.hardbreaks = true;
    options.parse.default_info_string = Some("rust".to_string());

    let cloned = options.clone();
    assert!(cloned.render.hardbreaks);
    assert_eq!(cloned.parse.default_info_string.as_deref(), Some("rust"));
    assert!(!format!("{:?}", cloned).is_empty());
}
