/// The encoding of a proof trace.
///
/// Text traces have one record per line and can be inspected by hand. Binary traces store every
/// integer as a varint, which keeps large refutations small.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Line-based UTF-8 records, with `*` comment lines.
    #[default]
    Text,
    /// Records of a code byte followed by varints.
    Binary,
}

impl Format {
    /// The byte which starts a comment record.
    pub(crate) const COMMENT_CODE: u8 = b'*';
}
