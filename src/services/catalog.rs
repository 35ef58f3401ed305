//! Catalog management service (books and categories)

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookInput, BookQuery},
        category::{Category, CategoryInput},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books with optional category filter and title/author search
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a book after validating fields and the category link
    pub async fn create_book(&self, book: BookInput) -> AppResult<Book> {
        let book = self.checked_book(book).await?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: BookInput) -> AppResult<Book> {
        let book = self.checked_book(book).await?;
        self.repository.books.update(id, &book).await
    }

    /// Delete a book and its history; refused while copies are out
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    async fn checked_book(&self, book: BookInput) -> AppResult<BookInput> {
        let book = book.normalized();
        book.validate()?;

        if !self.repository.categories.exists(book.book_category_id).await? {
            return Err(AppError::BadRequest(format!(
                "Category with id {} does not exist",
                book.book_category_id
            )));
        }

        Ok(book)
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    pub async fn create_category(&self, category: CategoryInput) -> AppResult<Category> {
        category.validate()?;
        self.repository
            .categories
            .create(&category.normalized_name())
            .await
    }

    pub async fn rename_category(&self, id: i32, category: CategoryInput) -> AppResult<Category> {
        category.validate()?;
        self.repository
            .categories
            .rename(id, &category.normalized_name())
            .await
    }

    /// Delete a category; refused while books reference it
    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.delete(id).await?;
        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}
