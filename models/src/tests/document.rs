use crate::DocumentUnit;

#[test]
fn given_file_name_with_extension_when_name_called_then_strips_extension() {
    let unit = DocumentUnit::new("Form.mxml", "fixtures", b"<s:Group/>".to_vec());

    assert_eq!(unit.name(), "Form");
    assert_eq!(unit.file_name(), "Form.mxml");
    assert_eq!(unit.group(), "fixtures");
}

#[test]
fn given_file_name_without_extension_when_name_called_then_returns_whole_name() {
    assert_eq!(DocumentUnit::new("README", "g", Vec::new()).name(), "README");
    assert_eq!(DocumentUnit::new(".hidden", "g", Vec::new()).name(), ".hidden");
}
