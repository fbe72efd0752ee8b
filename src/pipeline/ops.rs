use crate::error::KvormError;
use crate::schema::types::{Record, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// One recorded step in a pipeline's sequence. The chain accumulates these
/// without executing anything; classification at execution time decides
/// what actually runs and in what order.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Marks that read results are wanted (even alongside a mutation) and
    /// optionally projects each record down to the named fields. An empty
    /// field list means full records.
    Select(Vec<String>),
    Insert(Record),
    Update(Record),
    Upsert(Record),
    Delete,
    Filter(FilterCondition),
    Order { field: String, direction: Direction },
    Limit(usize),
    Offset(usize),
}

/// The single mutating operation of a chain, if any.
#[derive(Debug, Clone, Copy)]
pub enum MutationOp<'a> {
    Insert(&'a Record),
    Update(&'a Record),
    Upsert(&'a Record),
    Delete,
}

/// The execution-relevant shape of an operation sequence, extracted in a
/// single pass.
#[derive(Debug)]
pub struct ClassifiedChain<'a> {
    pub mutation: Option<MutationOp<'a>>,
    pub select: Option<&'a [String]>,
    pub filters: Vec<&'a FilterCondition>,
    pub order: Option<(&'a str, Direction)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Classifies an operation sequence: first mutating op wins, a second
/// mutating op of any kind rejects the whole chain. For order/limit/offset
/// the first occurrence is taken; offset always applies before limit
/// regardless of the position of the calls in the chain.
pub fn classify(operations: &[Operation]) -> Result<ClassifiedChain<'_>, KvormError> {
    let mut chain = ClassifiedChain {
        mutation: None,
        select: None,
        filters: Vec::new(),
        order: None,
        limit: None,
        offset: None,
    };

    for op in operations {
        let mutation = match op {
            Operation::Insert(payload) => Some(MutationOp::Insert(payload)),
            Operation::Update(payload) => Some(MutationOp::Update(payload)),
            Operation::Upsert(payload) => Some(MutationOp::Upsert(payload)),
            Operation::Delete => Some(MutationOp::Delete),
            _ => None,
        };
        if let Some(mutation) = mutation {
            if chain.mutation.is_some() {
                return Err(KvormError::InvalidChain {
                    reason: "at most one of insert/update/upsert/delete per chain".into(),
                });
            }
            chain.mutation = Some(mutation);
            continue;
        }

        match op {
            Operation::Select(fields) => {
                if chain.select.is_none() {
                    chain.select = Some(fields.as_slice());
                }
            }
            Operation::Filter(cond) => chain.filters.push(cond),
            Operation::Order { field, direction } => {
                if chain.order.is_none() {
                    chain.order = Some((field, *direction));
                }
            }
            Operation::Limit(n) => {
                if chain.limit.is_none() {
                    chain.limit = Some(*n);
                }
            }
            Operation::Offset(n) => {
                if chain.offset.is_none() {
                    chain.offset = Some(*n);
                }
            }
            // Mutating kinds were consumed above.
            Operation::Insert(_) | Operation::Update(_) | Operation::Upsert(_) | Operation::Delete => {}
        }
    }

    Ok(chain)
}
