use crate::query::ast::Query;

/// Convenience constructor for the common required/should/prohibited
/// shape, lowered onto the algebra as
/// `AndNot(AndMaybe(And(required), Or(should)), Or(prohibited))`.
#[derive(Debug, Clone, Default)]
pub struct BooleanQuery {
    pub required: Vec<Query>,
    pub should: Vec<Query>,
    pub prohibited: Vec<Query>,
}

impl BooleanQuery {
    pub fn new(required: Vec<Query>, should: Vec<Query>, prohibited: Vec<Query>) -> Self {
        BooleanQuery { required, should, prohibited }
    }

    pub fn with_required(mut self, query: Query) -> Self {
        self.required.push(query);
        self
    }

    pub fn with_should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    pub fn with_prohibited(mut self, query: Query) -> Self {
        self.prohibited.push(query);
        self
    }

    /// Lower to a normalized query tree.
    pub fn build(self) -> Query {
        Query::and_not(
            Query::and_maybe(Query::and(self.required), Query::or(self.should)),
            Query::or(self.prohibited),
        )
        .normalize()
    }
}
