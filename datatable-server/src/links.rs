//! Hyperlink augmentation of response records.
//!
//! A [`LinkRule`] is a relation name plus an href template whose `{field}`
//! placeholders are filled from the record, percent-encoded. `{+field}`
//! inserts the value as is, for fields that already hold a URL path. Rules
//! are registered per `(db, table)`; a rule whose fields are missing or null
//! yields no link.

use std::collections::HashMap;

use datatable::{Record, Value};
use serde::Serialize;

/// Percent-encode one path segment or query value. Spaces become `%20`,
/// which is valid in both positions.
fn encode_component(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone)]
pub struct LinkRule {
    rel: String,
    href: String,
}

impl LinkRule {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
        }
    }

    /// Fill the href template from `record`.
    pub fn render(&self, record: &Record) -> Option<Link> {
        let mut href = String::with_capacity(self.href.len());
        let mut rest = self.href.as_str();
        while let Some(start) = rest.find('{') {
            let end = start + rest[start..].find('}')?;
            href.push_str(&rest[..start]);
            let (raw, field) = match rest[start + 1..end].strip_prefix('+') {
                Some(field) => (true, field),
                None => (false, &rest[start + 1..end]),
            };
            match record.get(field) {
                Some(value) if !value.is_null() => {
                    let text = value.to_string();
                    if raw {
                        href.push_str(&text);
                    } else {
                        href.push_str(&encode_component(&text));
                    }
                }
                _ => return None,
            }
            rest = &rest[end + 1..];
        }
        href.push_str(rest);
        Some(Link {
            rel: self.rel.clone(),
            href,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkRules {
    rules: HashMap<(String, String), Vec<LinkRule>>,
}

impl LinkRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rules of the classic sample databases.
    pub fn defaults() -> Self {
        Self::new()
            .with_rule(
                "classicmodels",
                "orders",
                LinkRule::new("customer", "/api/classicmodels/customers/{customerNumber}"),
            )
            .with_rule(
                "classicmodels",
                "orders",
                LinkRule::new("self", "/api/classicmodels/orders/{orderNumber}"),
            )
            .with_rule(
                "classicmodels",
                "orders",
                LinkRule::new(
                    "orderdetails",
                    "/api/classicmodels/orderdetails?orderNumber={orderNumber}",
                ),
            )
            .with_rule(
                "W4111GoTSolutionClean",
                "actors_episodes",
                LinkRule::new("imdb", "https://www.imdb.com{+actorLink}"),
            )
    }

    pub fn with_rule(mut self, db: &str, table: &str, rule: LinkRule) -> Self {
        self.rules
            .entry((db.to_string(), table.to_string()))
            .or_default()
            .push(rule);
        self
    }

    /// Links for one record of `db.table`.
    pub fn links(&self, db: &str, table: &str, record: &Record) -> Vec<Link> {
        self.rules
            .get(&(db.to_string(), table.to_string()))
            .map(|rules| rules.iter().filter_map(|r| r.render(record)).collect())
            .unwrap_or_default()
    }

    /// The record as JSON, with a `links` array when any rule produced a link.
    pub fn augment(&self, db: &str, table: &str, record: Record) -> serde_json::Value {
        let links = self.links(db, table, &record);
        let mut object: serde_json::Map<String, serde_json::Value> = record
            .into_iter()
            .map(|(field, value)| (field, serde_json::Value::from(value)))
            .collect();
        if !links.is_empty() {
            let links = links
                .into_iter()
                .map(|l| serde_json::json!({ "rel": l.rel, "href": l.href }))
                .collect();
            object.insert("links".to_string(), serde_json::Value::Array(links));
        }
        serde_json::Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatable::template;

    #[test]
    fn test_order_links() {
        let order = template([
            ("orderNumber", Value::from(10100)),
            ("customerNumber", Value::from(363)),
        ]);
        let links = LinkRules::defaults().links("classicmodels", "orders", &order);
        assert_eq!(
            links,
            vec![
                Link {
                    rel: "customer".into(),
                    href: "/api/classicmodels/customers/363".into()
                },
                Link {
                    rel: "self".into(),
                    href: "/api/classicmodels/orders/10100".into()
                },
                Link {
                    rel: "orderdetails".into(),
                    href: "/api/classicmodels/orderdetails?orderNumber=10100".into()
                },
            ]
        );
    }

    #[test]
    fn test_missing_field_skips_link() {
        let rules = LinkRules::defaults();
        let cast = template([("actorName", "Sean Bean")]);
        assert!(rules.links("W4111GoTSolutionClean", "actors_episodes", &cast).is_empty());
        assert_eq!(
            rules.augment("W4111GoTSolutionClean", "actors_episodes", cast),
            serde_json::json!({ "actorName": "Sean Bean" })
        );

        let cast = template([("actorLink", "/name/nm0000293/")]);
        assert_eq!(
            rules.augment("W4111GoTSolutionClean", "actors_episodes", cast),
            serde_json::json!({
                "actorLink": "/name/nm0000293/",
                "links": [{ "rel": "imdb", "href": "https://www.imdb.com/name/nm0000293/" }]
            })
        );
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let rule = LinkRule::new("search", "/api/db/items/{name}?tag={tag}");
        let record = template([("name", "a/b?c"), ("tag", "x&y=z w")]);
        assert_eq!(
            rule.render(&record).unwrap().href,
            "/api/db/items/a%2Fb%3Fc?tag=x%26y%3Dz%20w"
        );

        let raw = LinkRule::new("page", "https://example.org{+path}");
        let record = template([("path", "/name/nm1/")]);
        assert_eq!(raw.render(&record).unwrap().href, "https://example.org/name/nm1/");
    }

    #[test]
    fn test_unrelated_table_is_untouched() {
        let record = template([("orderNumber", 1)]);
        assert_eq!(
            LinkRules::defaults().augment("classicmodels", "payments", record),
            serde_json::json!({ "orderNumber": 1 })
        );
    }
}
