use serde::Serialize;

/// A named group of generic style suggestions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleGroup {
    /// Group name (e.g. "Outerwear")
    pub category: String,
    /// Suggested items
    pub items: Vec<String>,
}

const DEFAULT_GROUPS: &[(&str, [&str; 3])] = &[
    (
        "Tops",
        ["Classic White Button-Down Shirt", "Soft Cashmere Sweater", "Elegant Silk Blouse"],
    ),
    (
        "Bottoms",
        ["High-Waisted Dark Jeans", "Tailored Black Trousers", "Flowing Midi Skirt"],
    ),
    (
        "Outerwear",
        ["Timeless Trench Coat", "Structured Blazer", "Cozy Wool Cardigan"],
    ),
    (
        "Accessories",
        ["Leather Crossbody Bag", "Classic Pearl Earrings", "Silk Square Scarf"],
    ),
];

/// Static suggestions shown when an analysis fails
pub fn default_recommendations() -> Vec<StyleGroup> {
    DEFAULT_GROUPS
        .iter()
        .map(|(category, items)| StyleGroup {
            category: category.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recommendations() {
        let groups = default_recommendations();
        let names: Vec<&str> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, vec!["Tops", "Bottoms", "Outerwear", "Accessories"]);
        assert!(groups.iter().all(|g| g.items.len() == 3));
    }
}
