pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod goodreads;
pub mod google_books;
pub mod identity;
pub mod openlibrary;
pub mod resolver;
