//! Free-text search over already-fetched posts.

use crate::domain::Post;

/// Case-insensitive substring match against title, excerpt, author name,
/// categories and tags. A blank query matches nothing.
pub fn search_posts<'a>(posts: &'a [Post], query: &str) -> Vec<&'a Post> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    posts.iter().filter(|post| matches(post, &needle)).collect()
}

fn matches(post: &Post, needle: &str) -> bool {
    let hit = |text: &str| text.to_lowercase().contains(needle);

    hit(&post.title)
        || hit(&post.excerpt)
        || hit(&post.author.name)
        || post.categories.iter().any(|c| hit(c))
        || post.tags.iter().any(|t| hit(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_post;
    use crate::records::{AuthorRecord, PostRecord};

    fn post(id: &str, title: &str, categories: &[&str], tags: &[&str]) -> Post {
        normalize_post(
            id,
            PostRecord {
                title: Some(title.into()),
                categories: Some(categories.iter().map(|s| s.to_string()).collect()),
                tags: Some(tags.iter().map(|s| s.to_string()).collect()),
                author: Some(AuthorRecord {
                    id: Some("u1".into()),
                    name: Some("Grace".into()),
                    avatar_url: None,
                }),
                ..PostRecord::default()
            },
        )
    }

    #[test]
    fn test_travel_matches_tag_and_category() {
        let posts = vec![
            post("a", "Packing light", &[], &["travel"]),
            post("b", "Lisbon in spring", &["Travel"], &[]),
            post("c", "Borrow checker tips", &["Rust"], &["lifetimes"]),
        ];

        let ids: Vec<_> = search_posts(&posts, "travel")
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_matches_author_and_is_case_insensitive() {
        let posts = vec![post("a", "Anything", &[], &[])];
        assert_eq!(search_posts(&posts, "GRACE").len(), 1);
        assert_eq!(search_posts(&posts, "anyTHING").len(), 1);
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let posts = vec![post("a", "Anything", &[], &[])];
        assert!(search_posts(&posts, "").is_empty());
        assert!(search_posts(&posts, "   ").is_empty());
    }
}
