use serde::{Deserialize, Serialize};

/// Category a taxonomy item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Keyword,
    Problem,
    Department,
}

/// Lifecycle status of a taxonomy item. Only active items feed
/// candidate search; pending and archived items are kept for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Pending,
    Archived,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Pending => "pending",
            ItemStatus::Archived => "archived",
        }
    }
}

/// One entry of the classification taxonomy.
///
/// Keywords reference their owning department via `department_id`;
/// problems are transversal unless `department_id` is set. `aliases`
/// and `examples` feed textual matching and semantic enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyItem {
    pub id: String,
    pub label: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub status: ItemStatus,
}

impl TaxonomyItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            department_id: None,
            aliases: Vec::new(),
            description: None,
            examples: Vec::new(),
            status: ItemStatus::Active,
        }
    }

    pub fn with_department(mut self, department_id: impl Into<String>) -> Self {
        self.department_id = Some(department_id.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }
}

/// Snapshot of the full taxonomy, loaded from the external store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    pub keywords: Vec<TaxonomyItem>,
    pub problems: Vec<TaxonomyItem>,
    pub departments: Vec<TaxonomyItem>,
}

impl Taxonomy {
    pub fn new(
        keywords: Vec<TaxonomyItem>,
        problems: Vec<TaxonomyItem>,
        departments: Vec<TaxonomyItem>,
    ) -> Self {
        Self {
            keywords,
            problems,
            departments,
        }
    }

    pub fn active_keywords(&self) -> impl Iterator<Item = &TaxonomyItem> {
        self.keywords.iter().filter(|i| i.is_active())
    }

    pub fn active_problems(&self) -> impl Iterator<Item = &TaxonomyItem> {
        self.problems.iter().filter(|i| i.is_active())
    }

    pub fn active_departments(&self) -> impl Iterator<Item = &TaxonomyItem> {
        self.departments.iter().filter(|i| i.is_active())
    }

    pub fn keyword_by_id(&self, id: &str) -> Option<&TaxonomyItem> {
        self.keywords.iter().find(|i| i.id == id)
    }

    pub fn problem_by_id(&self, id: &str) -> Option<&TaxonomyItem> {
        self.problems.iter().find(|i| i.id == id)
    }

    pub fn department_by_id(&self, id: &str) -> Option<&TaxonomyItem> {
        self.departments.iter().find(|i| i.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.problems.is_empty() && self.departments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_filters_skip_archived() {
        let taxonomy = Taxonomy::new(
            vec![
                TaxonomyItem::new("kw1", "A&B - Serviço", ItemKind::Keyword),
                TaxonomyItem::new("kw2", "Antiga", ItemKind::Keyword)
                    .with_status(ItemStatus::Archived),
            ],
            vec![],
            vec![],
        );
        let active: Vec<_> = taxonomy.active_keywords().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "kw1");
    }

    #[test]
    fn lookup_by_id() {
        let taxonomy = Taxonomy::new(
            vec![],
            vec![TaxonomyItem::new("pb1", "Demora no Atendimento", ItemKind::Problem)],
            vec![],
        );
        assert!(taxonomy.problem_by_id("pb1").is_some());
        assert!(taxonomy.problem_by_id("missing").is_none());
    }
}
