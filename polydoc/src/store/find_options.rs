use crate::collection::Document;
use crate::common::{SortOrder, CLASS_CHAIN, ID_FIELD};
use crate::errors::{ErrorKind, OdmError, OdmResult};

/// Options for `find` and `search`: projection, sort and paging.
///
/// Options compose with the builder methods or by merging the small
/// constructors below:
///
/// ```rust,ignore
/// let options = order_by("lastName", SortOrder::Ascending)
///     .sort("-age")
///     .offset(10)
///     .limit(5);
/// ```
///
/// Projections never remove `id` or the class chain; type checks on a
/// projected record still work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) include: Vec<String>,
    pub(crate) exclude: Vec<String>,
    pub(crate) sort: Vec<(String, SortOrder)>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

/// Creates options sorted by one field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

/// Creates options that skip the first `offset` records.
pub fn skip_by(offset: u64) -> FindOptions {
    FindOptions::new().offset(offset)
}

/// Creates options that return at most `limit` records.
pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

/// Creates options that project onto the given fields.
pub fn include_only<'a>(fields: impl IntoIterator<Item = &'a str>) -> FindOptions {
    fields
        .into_iter()
        .fold(FindOptions::new(), |options, field| options.include(field))
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    pub fn include(mut self, field_path: &str) -> FindOptions {
        if !self.include.iter().any(|f| f == field_path) {
            self.include.push(field_path.to_string());
        }
        self
    }

    pub fn exclude(mut self, field_path: &str) -> FindOptions {
        if !self.exclude.iter().any(|f| f == field_path) {
            self.exclude.push(field_path.to_string());
        }
        self
    }

    /// Adds a sort key in string form; a leading `-` sorts descending.
    pub fn sort(self, sort_key: &str) -> FindOptions {
        let (field, order) = SortOrder::parse(sort_key);
        self.sort_by(&field, order)
    }

    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort.retain(|(f, _)| f != field_name);
        self.sort.push((field_name.to_string(), sort_order));
        self
    }

    pub fn offset(mut self, offset: u64) -> FindOptions {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Combines two option sets. Projection and sort keys are appended, and
    /// paging values set in `other` win.
    pub fn merge(mut self, other: &FindOptions) -> FindOptions {
        for field in &other.include {
            self = self.include(field);
        }
        for field in &other.exclude {
            self = self.exclude(field);
        }
        for (field, order) in &other.sort {
            self = self.sort_by(field, *order);
        }
        if other.offset.is_some() {
            self.offset = other.offset;
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        self
    }

    pub fn includes(&self) -> &[String] {
        &self.include
    }

    pub fn excludes(&self) -> &[String] {
        &self.exclude
    }

    pub fn sort_fields(&self) -> &[(String, SortOrder)] {
        &self.sort
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn has_projection(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }

    /// Rejects a field path that is both included and excluded.
    pub fn validate(&self) -> OdmResult<()> {
        if let Some(field) = self.include.iter().find(|f| self.exclude.contains(f)) {
            log::error!("Field {} is both included and excluded", field);
            return Err(OdmError::new(
                &format!("Field {} is both included and excluded", field),
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }

    /// Applies the projection to a record.
    pub fn project(&self, record: &Document) -> OdmResult<Document> {
        let mut projected = if self.include.is_empty() {
            record.clone()
        } else {
            let mut projected = Document::new();
            for path in self.include.iter().map(String::as_str).chain([ID_FIELD, CLASS_CHAIN]) {
                let value = record.get(path);
                if !value.is_null() {
                    projected.put_path(path, value)?;
                }
            }
            projected
        };

        for path in &self.exclude {
            if path != ID_FIELD && path != CLASS_CHAIN {
                projected.remove_path(path);
            }
        }
        Ok(projected)
    }
}
