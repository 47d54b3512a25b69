use unicode_truncate::UnicodeTruncateStr;

use crate::catalog::CatalogItem;

/// Play intent raised by activating a card; carries the whole item
#[derive(Debug, Clone, PartialEq)]
pub struct PlayIntent(pub CatalogItem);

/// Display projection of a catalog item. Holds no state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Card<'a> {
    item: &'a CatalogItem,
}

impl<'a> From<&'a CatalogItem> for Card<'a> {
    fn from(item: &'a CatalogItem) -> Self {
        Card { item }
    }
}

impl<'a> Card<'a> {
    pub fn title(&self) -> &str {
        &self.item.title
    }

    pub fn year(&self) -> String {
        self.item.year.map(|y| y.to_string()).unwrap_or_default()
    }

    pub fn type_label(&self) -> &'static str {
        self.item.media_type.label()
    }

    pub fn description(&self) -> &str {
        &self.item.description
    }

    pub fn poster(&self) -> Option<&str> {
        self.item.poster.as_deref()
    }

    /// "2022 · Movie", without the year when unknown
    pub fn meta(&self) -> String {
        match self.item.year {
            Some(year) => format!("{} · {}", year, self.type_label()),
            None => self.type_label().to_string(),
        }
    }

    /// Title cut to `width` display columns, with an ellipsis when cut
    pub fn title_fitted(&self, width: usize) -> String {
        fit(&self.item.title, width)
    }

    pub fn description_fitted(&self, width: usize) -> String {
        fit(&self.item.description, width)
    }

    /// The play control
    pub fn activate(&self) -> PlayIntent {
        PlayIntent(self.item.clone())
    }
}

fn fit(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let (cut, cut_width) = text.unicode_truncate(width);
    if cut.len() == text.len() {
        return cut.to_string();
    }
    let (cut, _) = text.unicode_truncate(width.saturating_sub(1).min(cut_width));
    format!("{}…", cut)
}
