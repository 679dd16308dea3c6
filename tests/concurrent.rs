use json_dto::{DynamicObject, FieldSpec, Mappable, Resolved, TypeRegistry, load_schemas};
use rayon::prelude::*;
use serde_json::{Value, json};

#[derive(Debug, Default, PartialEq)]
struct Tag {
    label: Option<String>,
}

impl Mappable for Tag {
    const TYPE_NAME: &'static str = "Tag";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![FieldSpec::new("label", |t: &mut Self, v: Resolved| v.store(&mut t.label), |t: &Self| t.label.is_some())
            .typed("string")]
    }
}

#[derive(Debug, Default, PartialEq)]
struct Article {
    id: Option<i64>,
    tags: Vec<Tag>,
}

impl Mappable for Article {
    const TYPE_NAME: &'static str = "Article";

    fn fields() -> Vec<FieldSpec<Self>> {
        vec![
            FieldSpec::new("id", |a: &mut Self, v: Resolved| v.store(&mut a.id), |a: &Self| a.id.is_some()).typed("int"),
            FieldSpec::new(
                "tags",
                |a: &mut Self, v: Resolved| v.into_objects::<Tag>().map(|xs| a.tags = xs).is_some(),
                |a: &Self| !a.tags.is_empty(),
            )
            .doc("@var Tag[]"),
        ]
    }
}

fn input(i: i64) -> Value {
    json!({"id": i.to_string(), "tags": [{"label": "a"}, {"label": i}]})
}

#[test]
fn parallel_creates_share_discovery() {
    let mut registry = TypeRegistry::new();
    registry.register::<Tag>().register::<Article>();

    let articles: Vec<Article> = (0..256i64)
        .into_par_iter()
        .map(|i| {
            let Value::Object(record) = input(i) else { unreachable!() };
            registry.create::<Article>(&record).unwrap()
        })
        .collect();

    for (i, article) in articles.iter().enumerate() {
        assert_eq!(article.id, Some(i as i64));
        assert_eq!(article.tags.len(), 2);
        assert_eq!(article.tags[1].label, Some(i.to_string()));
    }
}

#[test]
fn parallel_schema_creates_agree() {
    let types = load_schemas(
        r#"[{"name": "Tag", "fields": [{"name": "label", "type": "string"}]},
            {"name": "Article", "fields": [{"name": "id", "type": "int"},
                                           {"name": "tags", "doc": "@var Tag[]"}]}]"#,
    )
    .unwrap();
    let mut registry = TypeRegistry::new();
    registry.register_schemas(types);

    let baseline = registry.create_named_from_value("Article", &input(7)).unwrap();
    let all_equal = (0..128)
        .into_par_iter()
        .map(|_| registry.create_named_from_value("Article", &input(7)).unwrap())
        .all(|obj| obj == baseline);
    assert!(all_equal);

    let article = baseline.downcast_ref::<DynamicObject>().unwrap();
    assert_eq!(article.pointer("/tags/1/label"), Some(&Resolved::Str("7".into())));
}
