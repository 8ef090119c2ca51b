/// One record's text fields, one per configured input column, in column
/// order. A missing field is `None` and featurizes like empty text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document<'a> {
    fields: Vec<Option<&'a str>>,
}

impl<'a> Document<'a> {
    pub fn new<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Single-column record.
    #[must_use]
    pub fn single(text: &'a str) -> Self {
        Self {
            fields: vec![Some(text)],
        }
    }

    /// Borrow a slice of owned texts as a record.
    pub fn from_texts<S: AsRef<str>>(texts: &'a [S]) -> Self {
        Self::new(texts.iter().map(|text| Some(text.as_ref())))
    }

    #[must_use]
    pub fn fields(&self) -> &[Option<&'a str>] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> From<&'a str> for Document<'a> {
    fn from(text: &'a str) -> Self {
        Self::single(text)
    }
}

impl<'a> From<Option<&'a str>> for Document<'a> {
    fn from(text: Option<&'a str>) -> Self {
        Self { fields: vec![text] }
    }
}

impl<'a> From<Vec<&'a str>> for Document<'a> {
    fn from(texts: Vec<&'a str>) -> Self {
        Self::new(texts.into_iter().map(Some))
    }
}

impl<'a> From<Vec<Option<&'a str>>> for Document<'a> {
    fn from(fields: Vec<Option<&'a str>>) -> Self {
        Self { fields }
    }
}
