/// Canonical identifier used for every key comparison across passes.
/// Example: `5` (parsed from the raw attribute `Id="5"`)
pub type CanonicalKey = i64;
/// Name of a record attribute or projected column.
/// Examples: `Id`, `OwnerUserId`, `DisplayName_User`
pub type FieldName = String;
/// Identifier for the source a pass reads from (usually its path).
/// Examples: `posts`, `data/Posts.xml`
pub type SourceId = String;
/// Local (unqualified) element name that marks one record.
/// Examples: `row`, `item`
pub type RecordTag = String;
/// Warning/log message text.
/// Example: `duplicate primary keys survived the join`
pub type LogMessage = String;
