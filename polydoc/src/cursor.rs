use crate::errors::OdmResult;
use crate::model::{codec, Model, ModelClass};
use crate::store::{LazyCount, RecordStream, SearchResult};

/// The result of a search.
///
/// A cursor pulls records from the backend lazily and caches every model it
/// has produced, so iterating again replays the cache before pulling more.
/// The backend is drained at most once however often the cursor is iterated.
///
/// [count](Cursor::count) is the backend's own count of matches. It is
/// independent of how much of the stream has been consumed, and it is
/// resolved at most once.
///
/// Records of a class outside the searched class (a sibling stored in the
/// same collection) are skipped.
pub struct Cursor {
    class: ModelClass,
    count: LazyCount,
    stream: Option<RecordStream>,
    cache: Vec<Model>,
}

impl Cursor {
    pub(crate) fn new(class: &ModelClass, result: SearchResult) -> Cursor {
        let (count, stream) = result.into_parts();
        Cursor {
            class: class.clone(),
            count,
            stream: Some(stream),
            cache: Vec::new(),
        }
    }

    pub fn model_class(&self) -> &ModelClass {
        &self.class
    }

    /// Number of records the backend reports for the search.
    pub fn count(&self) -> OdmResult<u64> {
        self.count.get()
    }

    pub fn iter(&mut self) -> CursorIter<'_> {
        CursorIter {
            cursor: self,
            position: 0,
        }
    }

    /// Materializes every remaining record and returns the full result.
    pub fn all(&mut self) -> OdmResult<Vec<Model>> {
        self.iter().collect()
    }

    /// The first model of the full result.
    ///
    /// This drains the whole stream. Use
    /// [ModelClass::find_first](crate::model::ModelClass::find_first) to
    /// read a single record from the backend.
    pub fn first(&mut self) -> OdmResult<Option<Model>> {
        Ok(self.all()?.into_iter().next())
    }

    /// Whether the backend stream has ended and the cache holds the full
    /// result.
    pub fn is_exhausted(&self) -> bool {
        self.stream.is_none()
    }

    /// Number of models produced so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn pull(&mut self) -> Option<OdmResult<Model>> {
        loop {
            let next = self.stream.as_mut()?.next();
            match next {
                None => {
                    self.stream = None;
                    return None;
                }
                Some(Err(err)) => return Some(Err(err)),
                Some(Ok(record)) => {
                    if !codec::record_is_a(&record, &self.class) {
                        log::debug!(
                            "Skipping record {} outside class {}",
                            record.id(),
                            self.class.name()
                        );
                        continue;
                    }
                    return match codec::restore_record(&record, &self.class) {
                        Ok(model) => {
                            self.cache.push(model.clone());
                            Some(Ok(model))
                        }
                        Err(err) => Some(Err(err)),
                    };
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a mut Cursor {
    type Item = OdmResult<Model>;
    type IntoIter = CursorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterates a [Cursor]: cached models first, then the rest of the stream.
pub struct CursorIter<'a> {
    cursor: &'a mut Cursor,
    position: usize,
}

impl Iterator for CursorIter<'_> {
    type Item = OdmResult<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(model) = self.cursor.cache.get(self.position) {
            self.position += 1;
            return Some(Ok(model.clone()));
        }

        let pulled = self.cursor.pull();
        if let Some(Ok(_)) = pulled {
            self.position += 1;
        }
        pulled
    }
}
