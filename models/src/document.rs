/// One document under test.
///
/// `group` is the name of the directory the original file lives in; the
/// worker uses it to locate expectations for the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUnit {
    file_name: String,
    group: String,
    content: Vec<u8>,
}

impl DocumentUnit {
    pub fn new(file_name: impl Into<String>, group: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            group: group.into(),
            content,
        }
    }

    /// File name including extension, e.g. `Form.mxml`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Display name: the file name without its extension, e.g. `Form`.
    pub fn name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(0) | None => &self.file_name,
            Some(dot) => &self.file_name[..dot],
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}
