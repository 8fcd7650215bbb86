pub mod flashcard_view;
pub mod menu;
pub mod notes_view;
pub mod section_tabs;
pub mod test_review;
pub mod weightage_chart;
