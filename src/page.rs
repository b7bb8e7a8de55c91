use std::collections::HashMap;

/// Element ids and endpoints of the drawing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub image_id: String,
    pub display_id: String,
    pub symbol_field: String,
    /// Rendered drawing, reloaded after every completed action.
    pub image_endpoint: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            image_id: "the_pict".to_string(),
            display_id: "the_smiles".to_string(),
            symbol_field: "symbol_text".to_string(),
            image_endpoint: "content.png".to_string(),
        }
    }
}

impl PageSettings {
    /// Image URL with a cache-busting query so the browser refetches it.
    pub fn image_source(&self, timestamp: u64) -> String {
        format!("{}?{}", self.image_endpoint, timestamp)
    }
}

pub trait Page {
    fn set_image_source(&mut self, src: &str);

    fn set_display_text(&mut self, text: &str);

    /// Current value of a named form field, read when called.
    fn form_value(&self, field: &str) -> Option<String>;
}

/// Page kept entirely in memory; useful for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPage {
    image_source: Option<String>,
    display_text: Option<String>,
    fields: HashMap<String, String>,
    image_history: Vec<String>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_source(&self) -> Option<&str> {
        self.image_source.as_deref()
    }

    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    /// Every image source written, oldest first.
    pub fn image_history(&self) -> &[String] {
        &self.image_history
    }

    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }
}

impl Page for MemoryPage {
    fn set_image_source(&mut self, src: &str) {
        self.image_source = Some(src.to_string());
        self.image_history.push(src.to_string());
    }

    fn set_display_text(&mut self, text: &str) {
        self.display_text = Some(text.to_string());
    }

    fn form_value(&self, field: &str) -> Option<String> {
        self.fields.get(field).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_served_page() {
        let settings = PageSettings::default();
        assert_eq!(settings.image_id, "the_pict");
        assert_eq!(settings.display_id, "the_smiles");
        assert_eq!(settings.symbol_field, "symbol_text");
        assert_eq!(settings.image_source(1700000000123), "content.png?1700000000123");
    }

    #[test]
    fn memory_page_tracks_image_history() {
        let mut page = MemoryPage::new();
        page.set_image_source("content.png?1");
        page.set_image_source("content.png?2");
        assert_eq!(page.image_source(), Some("content.png?2"));
        assert_eq!(page.image_history(), ["content.png?1", "content.png?2"]);
    }

    #[test]
    fn form_value_is_live() {
        let mut page = MemoryPage::new();
        assert_eq!(page.form_value("symbol_text"), None);
        page.set_field("symbol_text", "Br");
        assert_eq!(page.form_value("symbol_text").as_deref(), Some("Br"));
        page.set_field("symbol_text", "Cl");
        assert_eq!(page.form_value("symbol_text").as_deref(), Some("Cl"));
    }
}
