use serde::{Deserialize, Serialize};

/// A dragon record from the backend roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dragon {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Dragon {
    /// One-line listing form: name, with the description when present.
    pub fn display_line(&self) -> String {
        match self.description {
            Some(ref description) => format!("{} - {}", self.name, description),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_record() {
        let dragon: Dragon = serde_json::from_str(
            r#"{"id": 1, "name": "Smok Wawelski", "description": "Lives under the castle"}"#,
        )
        .unwrap();
        assert_eq!(dragon.id, Some(1));
        assert_eq!(dragon.name, "Smok Wawelski");
        assert_eq!(
            dragon.display_line(),
            "Smok Wawelski - Lives under the castle"
        );
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let dragon: Dragon = serde_json::from_str(r#"{"name": "Fafnir"}"#).unwrap();
        assert_eq!(dragon.id, None);
        assert_eq!(dragon.display_line(), "Fafnir");
    }
}
