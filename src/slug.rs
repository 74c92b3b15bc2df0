use crate::{
    models::{College, NewCollege},
    repository::{Repository, RepositoryError},
};

/// Base used when a name has no letters or digits, even after transliteration.
const FALLBACK_SLUG: &str = "college";

/// slugify
///
/// Normalizes a name into a lowercase, URL-safe base slug. The name is first
/// transliterated to ASCII (`"Montréal"` to `"Montreal"`, `"北京"` to `"Bei Jing"`).
/// Letters and digits are then kept, every other run of characters collapses into a
/// single `-`, and separators are never left at either end.
///
/// `"Indian Institute of Technology, Delhi"` becomes `"indian-institute-of-technology-delhi"`.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// allocate_slug
///
/// Returns a slug for `name` that no stored college currently uses. The base slug is used
/// as-is when free; otherwise `base-1`, `base-2`, ... are tried in order until one is.
///
/// The lookup is not atomic with the later insert. Two concurrent creators can pick the
/// same candidate; the repository's unique index rejects the second insert with
/// `RepositoryError::Duplicate` and the caller allocates again.
pub async fn allocate_slug(repo: &dyn Repository, name: &str) -> Result<String, RepositoryError> {
    let base = slugify(name);

    if repo.find_college_by_slug(&base).await?.is_none() {
        return Ok(base);
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if repo.find_college_by_slug(&candidate).await?.is_none() {
            tracing::debug!(%base, %candidate, "slug collision resolved");
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// Total insert attempts creation makes before giving up on a contested slug.
pub const SLUG_ATTEMPTS: usize = 3;

/// create_with_unique_slug
///
/// Allocates a slug for `record.name` and inserts the record. If the insert loses a race
/// for the slug (`Duplicate`), a fresh slug is allocated and the insert retried, up to
/// `SLUG_ATTEMPTS` times in total. Any other failure is returned immediately.
pub async fn create_with_unique_slug(
    repo: &dyn Repository,
    mut record: NewCollege,
) -> Result<College, RepositoryError> {
    for attempt in 1..=SLUG_ATTEMPTS {
        record.slug = allocate_slug(repo, &record.name).await?;

        match repo.create_college(record.clone()).await {
            Err(RepositoryError::Duplicate(field)) => {
                tracing::warn!(attempt, slug = %record.slug, field, "insert lost a uniqueness race");
            }
            result => return result,
        }
    }

    Err(RepositoryError::Duplicate("slug"))
}
