use crate::*;
use proptest::prelude::*;

fn blog() -> CollectionDefinition {
    CollectionDefinition::new("blog", CollectionMode::Multiple)
        .field(FieldNode::leaf("title", FieldType::Text))
}

#[test]
fn test_infer_basic_tables() {
    let schema = infer_schema(&blog()).unwrap();
    assert!(schema.table("doc__blog").is_some());
    assert!(schema.table("doc__blog__fields").is_some());
    // No revisions flag, no versions table.
    assert!(schema.table("ver__blog").is_none());

    let fields = schema.table("doc__blog__fields").unwrap();
    let title = fields.column("title").unwrap();
    assert_eq!(title.source, ColumnSource::Field);
    assert_eq!(title.sql_type, SqlType::Text);
    assert!(title.nullable);
    assert!(title.can_auto_remove);
}

#[test]
fn test_core_columns_injected_first_and_not_auto_removable() {
    let schema = infer_schema(&blog()).unwrap();
    let fields = schema.table("doc__blog__fields").unwrap();

    let first_field_idx = fields
        .columns
        .iter()
        .position(|c| c.source == ColumnSource::Field)
        .unwrap();
    assert!(
        fields.columns[..first_field_idx]
            .iter()
            .all(|c| c.source == ColumnSource::Core && !c.can_auto_remove)
    );
    assert!(fields.column("id").unwrap().primary);
    assert_eq!(
        fields
            .column("document_id")
            .unwrap()
            .foreign_key
            .as_ref()
            .unwrap()
            .table,
        "doc__blog"
    );
}

#[test]
fn test_versions_table_gated_on_revisions_flag() {
    let def = blog().flags(CollectionFlags {
        use_revisions: true,
        ..Default::default()
    });
    let schema = infer_schema(&def).unwrap();
    let versions = schema.table("ver__blog").unwrap();
    assert_eq!(versions.table_type, TableType::Versions);
    // Field-bearing tables pick up the version linkage.
    let fields = schema.table("doc__blog__fields").unwrap();
    let version_id = fields.column("version_id").unwrap();
    assert!(version_id.nullable);
    assert_eq!(version_id.foreign_key.as_ref().unwrap().table, "ver__blog");
}

#[test]
fn test_two_level_repeater_round_trip() {
    // A collection holding nothing but a two-level nested repeater infers
    // exactly 3 tables: document, items, nested_items.
    let def = CollectionDefinition::new("blog", CollectionMode::Multiple).field(
        FieldNode::repeater(
            "items",
            vec![
                FieldNode::leaf("label", FieldType::Text),
                FieldNode::repeater(
                    "nested_items",
                    vec![FieldNode::leaf("value", FieldType::Text)],
                ),
            ],
        ),
    );
    let schema = infer_schema(&def).unwrap();
    assert_eq!(schema.tables.len(), 3);

    let items = schema.table("doc__blog__fields__items").unwrap();
    assert_eq!(items.table_type, TableType::Repeater);
    assert_eq!(items.key.repeater_path, vec!["items"]);
    assert_eq!(
        items.column("parent_id").unwrap().foreign_key.as_ref().unwrap().table,
        "doc__blog"
    );

    let nested = schema
        .table("doc__blog__fields__items__nested_items")
        .unwrap();
    assert_eq!(nested.key.repeater_path, vec!["items", "nested_items"]);
    assert_eq!(
        nested.column("parent_id").unwrap().foreign_key.as_ref().unwrap().table,
        "doc__blog__fields__items"
    );
    assert!(nested.column("sort_order").is_some());
}

#[test]
fn test_fixed_brick_folds_into_fields_table() {
    let def = blog().brick(BrickDefinition::fixed(
        "seo",
        vec![FieldNode::leaf("title", FieldType::Text)],
    ));
    let schema = infer_schema(&def).unwrap();
    // No dedicated table for the fixed brick.
    assert!(schema.table("brick__blog__seo").is_none());
    let fields = schema.table("doc__blog__fields").unwrap();
    assert!(fields.column("title").is_some());
    assert!(fields.column("seo__title").is_some());
}

#[test]
fn test_builder_brick_gets_own_table() {
    let def = blog().brick(BrickDefinition::builder(
        "hero",
        vec![
            FieldNode::leaf("heading", FieldType::Text),
            FieldNode::repeater("slides", vec![FieldNode::leaf("url", FieldType::Media)]),
        ],
    ));
    let schema = infer_schema(&def).unwrap();

    let hero = schema.table("brick__blog__hero").unwrap();
    assert_eq!(hero.table_type, TableType::Brick);
    assert_eq!(hero.key.brick.as_deref(), Some("hero"));
    assert!(hero.column("heading").is_some());

    let slides = schema.table("brick__blog__hero__slides").unwrap();
    assert_eq!(slides.key.brick.as_deref(), Some("hero"));
    assert_eq!(
        slides.column("parent_id").unwrap().foreign_key.as_ref().unwrap().table,
        "brick__blog__hero"
    );
}

#[test]
fn test_tabs_contribute_no_tables() {
    let def = CollectionDefinition::new("blog", CollectionMode::Multiple).field(FieldNode::tab(
        "content",
        vec![FieldNode::leaf("body", FieldType::Wysiwyg)],
    ));
    let schema = infer_schema(&def).unwrap();
    assert_eq!(schema.tables.len(), 2);
    assert!(schema.table("doc__blog__fields").unwrap().column("body").is_some());
}

#[test]
fn test_inference_is_deterministic() {
    let def = blog().brick(BrickDefinition::builder(
        "hero",
        vec![FieldNode::leaf("heading", FieldType::Text)],
    ));
    let a = infer_schema(&def).unwrap();
    let b = infer_schema(&def).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.checksum(), b.checksum());
}

#[test]
fn test_declaration_order_does_not_change_checksum() {
    let forward = CollectionDefinition::new("blog", CollectionMode::Multiple)
        .field(FieldNode::leaf("title", FieldType::Text))
        .field(FieldNode::leaf("excerpt", FieldType::Textarea));
    let reversed = CollectionDefinition::new("blog", CollectionMode::Multiple)
        .field(FieldNode::leaf("excerpt", FieldType::Textarea))
        .field(FieldNode::leaf("title", FieldType::Text));
    assert_eq!(
        infer_schema(&forward).unwrap().checksum(),
        infer_schema(&reversed).unwrap().checksum()
    );
}

#[test]
fn test_schema_round_trips_through_json() {
    let def = blog().flags(CollectionFlags {
        use_revisions: true,
        use_translations: true,
        use_drafts: false,
    });
    let schema = infer_schema(&def).unwrap();
    let json = serde_json::to_string(&schema).unwrap();
    let back: CollectionSchema = serde_json::from_str(&json).unwrap();
    assert_eq!(schema, back);
    assert_eq!(schema.checksum(), back.checksum());
}

proptest! {
    #[test]
    fn prop_checksum_ignores_field_order(
        keys in proptest::collection::btree_set("[a-z]{1,8}", 1..6)
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let forward: Vec<FieldNode> = keys
            .iter()
            .map(|k| FieldNode::leaf(k.clone(), FieldType::Text))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let mut a = CollectionDefinition::new("blog", CollectionMode::Multiple);
        a.fields = forward;
        let mut b = CollectionDefinition::new("blog", CollectionMode::Multiple);
        b.fields = backward;

        prop_assert_eq!(
            infer_schema(&a).unwrap().checksum(),
            infer_schema(&b).unwrap().checksum()
        );
    }
}
