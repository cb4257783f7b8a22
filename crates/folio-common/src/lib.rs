pub mod forms;
pub mod id;
pub mod paging;
pub mod slug;
pub mod text;
pub mod types;
pub mod validation;
