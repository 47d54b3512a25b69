use crate::catalog::CatalogItem;

/// Result of running a query against the catalog
#[derive(Debug, PartialEq)]
pub enum SearchOutcome<'a> {
    /// Empty query, the results view is closed
    Closed,
    NoResults,
    Results(Vec<&'a CatalogItem>),
}

impl<'a> SearchOutcome<'a> {
    pub fn is_open(&self) -> bool {
        !matches!(self, SearchOutcome::Closed)
    }

    pub fn items(&self) -> &[&'a CatalogItem] {
        match self {
            SearchOutcome::Results(items) => items,
            _ => &[],
        }
    }
}

/// Case-insensitive substring match on title or description
pub fn search<'a>(items: &'a [CatalogItem], query: &str) -> SearchOutcome<'a> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return SearchOutcome::Closed;
    }

    let results: Vec<&CatalogItem> = items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&query)
                || item.description.to_lowercase().contains(&query)
        })
        .collect();

    if results.is_empty() {
        SearchOutcome::NoResults
    } else {
        SearchOutcome::Results(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{"items": [
                {"title": "The Batman", "type": "movie", "description": "Gotham noir."},
                {"title": "Heat", "type": "movie", "description": "A crime saga in Los Angeles."},
                {"title": "Dark", "type": "series", "description": "Time travel in Winden."}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_search_title_case_insensitive() {
        let catalog = catalog();
        let outcome = search(catalog.items(), "batman");
        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.items()[0].title, "The Batman");

        let outcome = search(catalog.items(), "  BATMAN ");
        assert_eq!(outcome.items().len(), 1);
    }

    #[test]
    fn test_search_matches_description() {
        let catalog = catalog();
        let outcome = search(catalog.items(), "winden");
        assert_eq!(outcome.items()[0].title, "Dark");
    }

    #[test]
    fn test_empty_query_closes_results() {
        let catalog = catalog();
        assert_eq!(search(catalog.items(), ""), SearchOutcome::Closed);
        assert_eq!(search(catalog.items(), "   "), SearchOutcome::Closed);
        assert!(!search(catalog.items(), "").is_open());
    }

    #[test]
    fn test_no_results() {
        let catalog = catalog();
        let outcome = search(catalog.items(), "zzz");
        assert_eq!(outcome, SearchOutcome::NoResults);
        assert!(outcome.is_open());
        assert!(outcome.items().is_empty());
    }

    #[test]
    fn test_search_keeps_catalog_order() {
        let catalog = catalog();
        let outcome = search(catalog.items(), "a");
        let titles: Vec<&str> = outcome.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["The Batman", "Heat", "Dark"]);
    }
}
