pub mod flashcards;
pub mod mock_test;
