//! Folding flat LEFT JOIN rows into nested parents
//!
//! A parent with N children comes back as N rows repeating the parent
//! columns; a parent with none comes back as one row with NULL child columns.

use std::collections::HashMap;

/// A parent that collects children of one kind
pub trait Nested {
    type Child;

    fn key(&self) -> &str;

    fn attach(&mut self, child: Self::Child);
}

/// One row of a parent LEFT JOIN child query
pub trait JoinedRow {
    type Parent: Nested;

    /// Split into the parent columns and the child, if the child columns
    /// were not NULL.
    fn into_parts(self) -> (Self::Parent, Option<<Self::Parent as Nested>::Child>);
}

/// Fold rows into parents in first-seen order.
///
/// Repeated parent columns are only taken from the first row of each parent.
pub fn fold_joined<R, I>(rows: I) -> Vec<R::Parent>
where
    R: JoinedRow,
    I: IntoIterator<Item = R>,
{
    let mut parents: Vec<R::Parent> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let (parent, child) = row.into_parts();
        let position = match index.get(parent.key()) {
            Some(&i) => i,
            None => {
                index.insert(parent.key().to_string(), parents.len());
                parents.push(parent);
                parents.len() - 1
            }
        };
        if let Some(child) = child {
            parents[position].attach(child);
        }
    }

    parents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Post {
        id: String,
        labels: Vec<(String, String)>,
    }

    impl Nested for Post {
        type Child = (String, String);

        fn key(&self) -> &str {
            &self.id
        }

        fn attach(&mut self, child: Self::Child) {
            self.labels.push(child);
        }
    }

    struct Row(&'static str, Option<&'static str>, Option<&'static str>);

    impl JoinedRow for Row {
        type Parent = Post;

        fn into_parts(self) -> (Post, Option<(String, String)>) {
            let child = match (self.1, self.2) {
                (Some(id), Some(name)) => Some((id.to_string(), name.to_string())),
                _ => None,
            };
            (
                Post {
                    id: self.0.to_string(),
                    labels: Vec::new(),
                },
                child,
            )
        }
    }

    #[test]
    fn test_parent_with_children_and_childless_parent() {
        let rows = vec![
            Row("1", Some("1"), Some("tag1")),
            Row("1", Some("2"), Some("tag2")),
            Row("2", None, None),
        ];

        let posts = fold_joined(rows);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "1");
        assert_eq!(
            posts[0].labels,
            vec![
                ("1".to_string(), "tag1".to_string()),
                ("2".to_string(), "tag2".to_string())
            ]
        );
        assert_eq!(posts[1].id, "2");
        assert!(posts[1].labels.is_empty());
    }

    #[test]
    fn test_first_seen_order_survives_interleaving() {
        let rows = vec![
            Row("b", Some("1"), Some("x")),
            Row("a", None, None),
            Row("b", Some("2"), Some("y")),
        ];

        let posts = fold_joined(rows);
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(posts[0].labels.len(), 2);
    }

    #[test]
    fn test_half_null_child_is_skipped() {
        let posts = fold_joined(vec![Row("1", Some("9"), None)]);
        assert!(posts[0].labels.is_empty());
    }

    #[test]
    fn test_no_rows() {
        let posts = fold_joined(Vec::<Row>::new());
        assert!(posts.is_empty());
    }
}
