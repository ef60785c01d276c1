/// Field names of the StackExchange-style dump layout the defaults target.
pub mod fields {
    /// Primary key attribute shared by posts and users.
    pub const ID: &str = "Id";
    /// Foreign key from a post to its owning user.
    pub const OWNER_USER_ID: &str = "OwnerUserId";
    /// Foreign key from comments and votes to a post.
    pub const POST_ID: &str = "PostId";
    /// Foreign key from a comment to its author.
    pub const USER_ID: &str = "UserId";
    /// Post type discriminator used by the default primary filter.
    pub const POST_TYPE_ID: &str = "PostTypeId";
    /// `PostTypeId` value that marks a question (a top-level post).
    pub const QUESTION_POST_TYPE: &str = "1";
}

/// Constants used by the scanner and the extraction passes.
pub mod scan {
    /// Default local element name carrying one record.
    pub const DEFAULT_RECORD_TAG: &str = "row";
    /// Scanned-record interval between progress log lines.
    pub const PROGRESS_EVERY: u64 = 100_000;
}

/// Constants used by the denormalizer and the default projection.
pub mod join {
    /// Derived field holding the ordered grouped children of a row.
    pub const CHILDREN_FIELD: &str = "Comments";
    /// Derived count of grouped children per row.
    pub const CHILD_COUNT_FIELD: &str = "CommentRecordCount";
    /// Aggregated count of flat children per row.
    pub const FLAT_COUNT_FIELD: &str = "VoteRecordCount";
    /// Suffix applied to projected primary-record columns.
    pub const PRIMARY_SUFFIX: &str = "_Post";
    /// Suffix applied to projected reference-record columns.
    pub const REFERENCE_SUFFIX: &str = "_User";
    /// Primary-record fields kept in the default projection, in output order.
    pub const DEFAULT_PRIMARY_COLUMNS: [&str; 14] = [
        "Id",
        "PostTypeId",
        "AcceptedAnswerId",
        "CreationDate",
        "Score",
        "ViewCount",
        "Body",
        "OwnerUserId",
        "LastActivityDate",
        "Title",
        "Tags",
        "AnswerCount",
        "CommentCount",
        "FavoriteCount",
    ];
    /// Reference-record fields kept in the default projection, in output order.
    pub const DEFAULT_REFERENCE_COLUMNS: [&str; 8] = [
        "Id",
        "Reputation",
        "CreationDate",
        "DisplayName",
        "LastAccessDate",
        "Location",
        "UpVotes",
        "DownVotes",
    ];
}

/// Constants used by the command-line runners.
pub mod cli {
    /// Default destination of the combined table.
    pub const DEFAULT_OUTPUT_FILE: &str = "combined_sample_data.parquet";
    /// Default `tracing` directive when `RUST_LOG` is unset.
    pub const DEFAULT_LOG_DIRECTIVE: &str = "info";
}
