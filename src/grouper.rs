use crate::schema::Transaction;
use strsim::levenshtein;

/// Transactions sharing a fuzzy-equivalent description, ordered by date.
///
/// `deltas[i]` is the day gap between members `i` and `i + 1`, so
/// `deltas.len() == members.len() - 1` always holds.
#[derive(Debug, Clone)]
pub struct TransactionGroup {
    /// The first-seen member's description, used as the group's display name.
    pub name: String,
    pub members: Vec<Transaction>,
    pub deltas: Vec<i64>,
}

/// Maps normalized description keys to cluster handles. Insertion either
/// joins the first sufficiently-similar existing cluster or opens a new
/// one, so cluster order is first-seen order and deterministic for a
/// given input order.
#[derive(Debug, Default)]
pub struct DescriptionIndex {
    keys: Vec<String>,
}

impl DescriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cluster handle for `description`, creating a new
    /// cluster when nothing similar exists yet.
    pub fn insert(&mut self, description: &str) -> usize {
        let key = normalize(description);
        match self.find(&key) {
            Some(handle) => handle,
            None => {
                self.keys.push(key);
                self.keys.len() - 1
            }
        }
    }

    /// Non-inserting lookup, used when matching realized transactions
    /// against already-built clusters.
    pub fn lookup(&self, description: &str) -> Option<usize> {
        self.find(&normalize(description))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn find(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| similar(k, key))
    }
}

/// Case-folds and strips trailing reference tokens (store numbers,
/// receipt ids) so "GROCER 0451" and "Grocer 0783" share a key.
fn normalize(description: &str) -> String {
    let lowered = description.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();

    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1];
        let is_reference = last
            .trim_start_matches(['#', 'x'])
            .chars()
            .all(|c| c.is_ascii_digit())
            && last.chars().any(|c| c.is_ascii_digit());
        if is_reference {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Exact containment, or a bounded edit distance scaled to key length.
fn similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return a == b;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    let limit = a.len().min(b.len()) / 4;
    limit > 0 && levenshtein(a, b) <= limit
}

/// Partitions transactions into description-similarity groups. Members
/// are date-sorted and day-gap deltas computed per group. The input is
/// expected to be pre-filtered of internal and blacklisted categories.
pub fn cluster(transactions: &[Transaction]) -> Vec<TransactionGroup> {
    let mut index = DescriptionIndex::new();
    let mut buckets: Vec<Vec<Transaction>> = Vec::new();

    for txn in transactions {
        let handle = index.insert(&txn.description);
        if handle == buckets.len() {
            buckets.push(Vec::new());
        }
        buckets[handle].push(txn.clone());
    }

    buckets
        .into_iter()
        .map(|mut members| {
            let name = members[0].description.clone();
            members.sort_by_key(|t| t.date);
            let deltas = members
                .windows(2)
                .map(|pair| (pair[1].date - pair[0].date).num_days())
                .collect();
            TransactionGroup {
                name,
                members,
                deltas,
            }
        })
        .collect()
}
