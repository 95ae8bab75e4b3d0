use crate::models::{
    ComputedField, Document, EntitySchema, FieldKind, FieldSpec, FilterSpec, Limit, Presence,
    Rule, Value,
};

fn in_stock(document: &Document) -> Value {
    Value::Bool(document.get("quantity").as_i64().unwrap_or(0) > 0)
}

pub static PRODUCTS: EntitySchema = EntitySchema {
    collection: "products",
    entity_name: "Product",
    display_field: "name",
    fields: &[
        FieldSpec {
            name: "name",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(150)],
        },
        FieldSpec {
            name: "category",
            kind: FieldKind::Text,
            presence: Presence::Required,
            rules: &[Rule::Trim, Rule::NonEmpty, Rule::MaxLength(150)],
        },
        FieldSpec {
            name: "price",
            kind: FieldKind::Float,
            presence: Presence::Required,
            rules: &[
                Rule::Range {
                    min: Some(Limit::Exclusive(0.0)),
                    max: None,
                },
                Rule::Round(2),
            ],
        },
        FieldSpec {
            name: "quantity",
            kind: FieldKind::Integer,
            presence: Presence::Required,
            rules: &[Rule::Range {
                min: Some(Limit::Inclusive(0.0)),
                max: None,
            }],
        },
    ],
    filters: &[
        FilterSpec::Contains {
            param: "name",
            field: "name",
        },
        FilterSpec::Contains {
            param: "category",
            field: "category",
        },
        FilterSpec::Range {
            field: "price",
            min_param: "min_price",
            max_param: "max_price",
            floor: Some(0.0),
        },
    ],
    sortable: &["name", "category", "price"],
    indexes: &["name", "category", "price"],
    computed: &[ComputedField {
        name: "in_stock",
        compute: in_stock,
    }],
};
