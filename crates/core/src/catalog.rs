use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

/// The shop's reference menu, loaded once at startup from a JSONL file
/// (one item per line) and immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct Menu {
    items: Vec<MenuItem>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn load(path: &Path) -> Result<Self, DomainError> {
        let raw = fs::read_to_string(path).map_err(|source| DomainError::DataFileRead {
            path: path.display().to_string(),
            reason: source.to_string(),
        })?;

        let mut items = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let item: MenuItem =
                serde_json::from_str(line).map_err(|source| DomainError::DataFileParse {
                    path: path.display().to_string(),
                    line: index + 1,
                    reason: source.to_string(),
                })?;
            items.push(item);
        }

        if items.is_empty() {
            return Err(DomainError::EmptyDataFile { path: path.display().to_string() });
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Exact-name lookup; the first matching item wins when a name exists
    /// in more than one category.
    pub fn find(&self, name: &str) -> Option<&MenuItem> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }

    /// Distinct category names in stable alphabetical order.
    pub fn categories(&self) -> Vec<String> {
        let unique: BTreeSet<&str> =
            self.items.iter().map(|item| item.category.as_str()).collect();
        unique.into_iter().map(str::to_owned).collect()
    }

    /// One `name - ₹price` line per item, for embedding in prompts. Items
    /// whose name repeats across categories carry the category in parens
    /// so the listing stays unambiguous.
    pub fn price_list(&self) -> String {
        let mut lines = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let duplicated = self.items.iter().filter(|other| other.name == item.name).count() > 1;
            let label = if duplicated {
                format!("{} ({})", item.name, item.category)
            } else {
                item.name.clone()
            };
            lines.push(format!("{label} - ₹{}", format_price(item.price)));
        }
        lines.join("\n")
    }

    /// Per-item knowledge snippets, used as retrieval-fallback context by
    /// the details stage.
    pub fn context_snippets(&self) -> String {
        let snippets: Vec<String> = self
            .items
            .iter()
            .map(|item| {
                format!(
                    "Name: {}\nCategory: {}\nPrice: ₹{}\nDescription: {}\n",
                    item.name,
                    item.category,
                    format_price(item.price),
                    item.description
                )
            })
            .collect();
        snippets.join("\n")
    }
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as i64)
    } else {
        format!("{price:.2}")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{Menu, MenuItem};
    use crate::errors::DomainError;

    fn sample_menu() -> Menu {
        Menu::new(vec![
            MenuItem {
                name: "Cappuccino".to_owned(),
                category: "Coffee".to_owned(),
                price: 375.0,
                description: "Espresso with steamed milk foam".to_owned(),
            },
            MenuItem {
                name: "Dark chocolate".to_owned(),
                category: "Drinking Chocolate".to_owned(),
                price: 415.0,
                description: "Rich drinking chocolate".to_owned(),
            },
            MenuItem {
                name: "Dark chocolate".to_owned(),
                category: "Packaged Chocolate".to_owned(),
                price: 250.0,
                description: "Take-home chocolate bar".to_owned(),
            },
        ])
    }

    #[test]
    fn load_parses_jsonl_and_skips_blank_lines() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("products.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"name":"Latte","category":"Coffee","price":395,"description":"Silky espresso and milk"}"#,
                "\n\n",
                r#"{"name":"Croissant","category":"Bakery","price":270,"description":"Buttery and flaky"}"#,
                "\n",
            ),
        )
        .expect("write products");

        let menu = Menu::load(&path).expect("menu should load");
        assert_eq!(menu.len(), 2);
        assert_eq!(menu.find("Latte").map(|item| item.price), Some(395.0));
    }

    #[test]
    fn load_reports_the_offending_line() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("products.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"name":"Latte","category":"Coffee","price":395}"#,
                "\n",
                "not json\n",
            ),
        )
        .expect("write products");

        let error = Menu::load(&path).expect_err("malformed line should fail the load");
        assert!(matches!(error, DomainError::DataFileParse { line: 2, .. }));
    }

    #[test]
    fn find_returns_first_match_for_duplicate_names() {
        let menu = sample_menu();
        let item = menu.find("Dark chocolate").expect("item exists");
        assert_eq!(item.category, "Drinking Chocolate");
    }

    #[test]
    fn price_list_disambiguates_duplicate_names() {
        let listing = sample_menu().price_list();
        assert!(listing.contains("Cappuccino - ₹375"));
        assert!(listing.contains("Dark chocolate (Drinking Chocolate) - ₹415"));
        assert!(listing.contains("Dark chocolate (Packaged Chocolate) - ₹250"));
    }

    #[test]
    fn categories_are_distinct_and_sorted() {
        let categories = sample_menu().categories();
        assert_eq!(categories, vec!["Coffee", "Drinking Chocolate", "Packaged Chocolate"]);
    }

    #[test]
    fn context_snippets_cover_every_field() {
        let snippets = sample_menu().context_snippets();
        assert!(snippets.contains("Name: Cappuccino"));
        assert!(snippets.contains("Category: Coffee"));
        assert!(snippets.contains("Price: ₹375"));
        assert!(snippets.contains("Description: Espresso with steamed milk foam"));
    }
}
