pub mod item;
pub mod question;

pub use item::{AttributeValue, Item, PRIMARY_KEY};
pub use question::{NewQuestion, Question, QuestionPatch};
