//! Diesel table definitions for the forum schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts and their salted password digests.
    users (username) {
        /// Primary key, at most 64 characters.
        username -> Varchar,
        /// 16-byte random salt.
        password_salt -> Bytea,
        /// SHA-256 of salt followed by the password.
        password_digest -> Bytea,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Submitted posts with their maintained score.
    posts (id) {
        /// 32 lowercase hex characters.
        id -> Varchar,
        author -> Varchar,
        content -> Text,
        /// Starts at 1; only changed by vote commits or explicit overwrite.
        score -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One vote per `(voter, post_id)`.
    votes (voter, post_id) {
        voter -> Varchar,
        post_id -> Varchar,
        /// `1` for up, `-1` for down.
        direction -> Int2,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(posts -> users (author));
diesel::joinable!(votes -> posts (post_id));

diesel::allow_tables_to_appear_in_same_query!(posts, users, votes);
