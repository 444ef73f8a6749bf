pub mod dispatcher;
pub mod outcome;
