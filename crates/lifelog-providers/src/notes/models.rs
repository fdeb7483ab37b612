use serde::Deserialize;
use serde_json::Value;

/// Block types whose content is plain prose worth indexing
pub const TEXT_BLOCK_TYPES: &[&str] = &[
    "paragraph",
    "bulleted_list_item",
    "numbered_list_item",
    "to_do",
    "quote",
    "callout",
];

pub fn is_text_bearing(block_type: &str) -> bool {
    TEXT_BLOCK_TYPES.contains(&block_type)
}

/// One entry in a workspace search result page
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(default)]
    pub object: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSearchPage {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Page metadata. Properties stay opaque; the title is extracted from
/// whichever property carries type "title".
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub properties: Value,
}

impl PageMeta {
    pub fn title(&self) -> String {
        let Some(props) = self.properties.as_object() else {
            return String::new();
        };
        for prop in props.values() {
            if prop.get("type").and_then(Value::as_str) == Some("title") {
                return plain_text(prop.get("title"));
            }
        }
        String::new()
    }
}

/// A block as returned by the children listing. The per-type payload keeps
/// its dynamic key (e.g. "paragraph": {"rich_text": [...]}) so it stays in
/// the flattened remainder.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockData {
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(flatten)]
    pub payload: Value,
}

impl BlockData {
    /// Concatenated plain text for text-bearing types, empty otherwise
    pub fn plain_text(&self) -> String {
        if !is_text_bearing(&self.block_type) {
            return String::new();
        }
        plain_text(
            self.payload
                .get(&self.block_type)
                .and_then(|body| body.get("rich_text")),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockPage {
    #[serde(default)]
    pub results: Vec<BlockData>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

fn plain_text(rich_text: Option<&Value>) -> String {
    let Some(items) = rich_text.and_then(Value::as_array) else {
        return String::new();
    };
    items
        .iter()
        .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_plain_text_reads_typed_payload() {
        let block: BlockData = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {
                "rich_text": [
                    {"plain_text": "Team sync "},
                    {"plain_text": "about auth module."}
                ]
            }
        }))
        .unwrap();
        assert_eq!(block.plain_text(), "Team sync about auth module.");
    }

    #[test]
    fn non_text_bearing_blocks_yield_empty_text() {
        let block: BlockData = serde_json::from_value(serde_json::json!({
            "id": "b2",
            "type": "image",
            "image": {"rich_text": [{"plain_text": "caption"}]}
        }))
        .unwrap();
        assert_eq!(block.plain_text(), "");
    }

    #[test]
    fn page_title_comes_from_title_property() {
        let page: PageMeta = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "url": "https://notes.example/p1",
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": "Daily log"}]},
                "Status": {"type": "select"}
            }
        }))
        .unwrap();
        assert_eq!(page.title(), "Daily log");
    }
}
