use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    forms::ContactForm,
    models::{Contact, ContactWithCategory},
    pagination::{Page, Paginator},
    services::categories::CategoriesService,
};

/// Text columns the public search matches against.
const SEARCH_COLUMNS: [&str; 4] = ["first_name", "last_name", "phone", "email"];

/// Wraps a search term for ILIKE, matching `%`, `_` and `\` literally.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `SELECT <columns> FROM contacts` restricted to visible rows, optionally
/// narrowed by a search pattern.
fn visible_contacts(columns: &str, pattern: Option<&str>) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {} FROM contacts WHERE show = true",
        columns
    ));

    if let Some(pattern) = pattern {
        query.push(" AND (");
        for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query.push(*column).push(" ILIKE ");
            query.push_bind(pattern.to_string());
        }
        query.push(")");
    }

    query
}

pub struct ContactsService {
    db: PgPool,
}

impl ContactsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Visible contacts in table order, one page at a time
    pub async fn list_contacts(&self, page: Option<&str>, per_page: i64) -> AppResult<Page<Contact>> {
        self.fetch_page(None, page, per_page).await
    }

    /// Visible contacts whose name, phone or email contains `term`
    pub async fn search_contacts(
        &self,
        term: &str,
        page: Option<&str>,
        per_page: i64,
    ) -> AppResult<Page<Contact>> {
        let pattern = like_pattern(term);
        self.fetch_page(Some(&pattern), page, per_page).await
    }

    async fn fetch_page(
        &self,
        pattern: Option<&str>,
        page: Option<&str>,
        per_page: i64,
    ) -> AppResult<Page<Contact>> {
        let count: i64 = visible_contacts("COUNT(*)", pattern)
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let window = Paginator::new(count, per_page).get_page(page);
        if window.row_count() == 0 {
            return Ok(window.into_page(Vec::new()));
        }

        let mut query = visible_contacts("*", pattern);
        query
            .push(" ORDER BY created_at, id LIMIT ")
            .push_bind(window.limit())
            .push(" OFFSET ")
            .push_bind(window.offset());

        let contacts: Vec<Contact> = query.build_query_as().fetch_all(&self.db).await?;

        Ok(window.into_page(contacts))
    }

    /// A single visible contact; hidden and missing contacts look the same
    pub async fn get_contact(&self, id: Uuid) -> AppResult<ContactWithCategory> {
        let contact: Option<Contact> =
            sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND show = true")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        let contact = contact.ok_or(AppError::ContactNotFound)?;

        let category = match contact.category_id {
            Some(category_id) => {
                CategoriesService::new(self.db.clone())
                    .get_category(category_id)
                    .await?
            }
            None => None,
        };

        Ok(ContactWithCategory { contact, category })
    }

    /// Get a contact owned by `owner_id`, visible or not
    pub async fn get_owned_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<Contact> {
        let contact: Option<Contact> =
            sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;

        contact.ok_or(AppError::ContactNotFound)
    }

    pub async fn create_contact(&self, owner_id: Uuid, form: ContactForm) -> AppResult<Contact> {
        let data = form.clean(&CategoriesService::new(self.db.clone())).await?;

        let contact: Contact = sqlx::query_as(
            r#"
            INSERT INTO contacts
                (id, first_name, last_name, phone, email, description, category_id, show, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(&data.description)
        .bind(data.category_id)
        .bind(data.show.unwrap_or(true))
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!("Contact {} created by {}", contact.id, owner_id);
        Ok(contact)
    }

    pub async fn update_contact(
        &self,
        owner_id: Uuid,
        id: Uuid,
        form: ContactForm,
    ) -> AppResult<Contact> {
        // Foreign contacts are reported missing before the form is looked at
        self.get_owned_contact(owner_id, id).await?;

        let data = form.clean(&CategoriesService::new(self.db.clone())).await?;

        let contact: Option<Contact> = sqlx::query_as(
            r#"
            UPDATE contacts
            SET first_name = $3,
                last_name = $4,
                phone = $5,
                email = $6,
                description = $7,
                category_id = $8,
                show = COALESCE($9, show),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(&data.description)
        .bind(data.category_id)
        .bind(data.show)
        .fetch_optional(&self.db)
        .await?;

        contact.ok_or(AppError::ContactNotFound)
    }

    pub async fn delete_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ContactNotFound);
        }

        tracing::info!("Contact {} deleted by {}", id, owner_id);
        Ok(())
    }

    pub async fn set_picture(&self, owner_id: Uuid, id: Uuid, picture_url: &str) -> AppResult<Contact> {
        let contact: Option<Contact> = sqlx::query_as(
            r#"
            UPDATE contacts
            SET picture = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(picture_url)
        .fetch_optional(&self.db)
        .await?;

        contact.ok_or(AppError::ContactNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn owner(db: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, 'x')",
        )
        .bind(id)
        .bind(format!("owner-{}", id))
        .bind(format!("{}@example.com", id))
        .execute(db)
        .await
        .unwrap();
        id
    }

    fn form(first_name: &str, last_name: &str, phone: &str, email: Option<&str>) -> ContactForm {
        ContactForm {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            phone: Some(phone.to_string()),
            email: email.map(str::to_string),
            ..Default::default()
        }
    }

    fn hidden(mut form: ContactForm) -> ContactForm {
        form.show = Some(false);
        form
    }

    fn ids(page: &Page<Contact>) -> Vec<Uuid> {
        page.items.iter().map(|c| c.id).collect()
    }

    /// Beatriz and Carlos are public, Ana is hidden.
    async fn seed_directory(service: &ContactsService, owner_id: Uuid) -> (Contact, Contact, Contact) {
        let beatriz = service
            .create_contact(
                owner_id,
                form("Beatriz", "Oliveira", "+55 11 4000-1234", Some("ana@x.com")),
            )
            .await
            .unwrap();
        let carlos = service
            .create_contact(owner_id, form("Carlos", "Mendes", "+55 21 5555-0000", None))
            .await
            .unwrap();
        let ana = service
            .create_contact(owner_id, hidden(form("Ana", "Prado", "999", None)))
            .await
            .unwrap();
        (beatriz, carlos, ana)
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn hidden_contacts_are_left_out_of_listing_and_search(db: PgPool) {
        let owner_id = owner(&db).await;
        let service = ContactsService::new(db);
        let (beatriz, carlos, ana) = seed_directory(&service, owner_id).await;
        assert!(!ana.show);

        let page = service.list_contacts(None, 10).await.unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(ids(&page), vec![beatriz.id, carlos.id]);

        let page = service.search_contacts("ANA", None, 10).await.unwrap();
        assert_eq!(ids(&page), vec![beatriz.id]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn search_ignores_case_on_every_column(db: PgPool) {
        let owner_id = owner(&db).await;
        let service = ContactsService::new(db);
        let (beatriz, carlos, _) = seed_directory(&service, owner_id).await;

        for (term, expected) in [
            ("bEaTrIz", beatriz.id),
            ("OLIVEIRA", beatriz.id),
            ("4000-1234", beatriz.id),
            ("ANA@X.COM", beatriz.id),
            ("mendes", carlos.id),
        ] {
            let page = service.search_contacts(term, None, 10).await.unwrap();
            assert_eq!(ids(&page), vec![expected], "{}", term);
        }

        let page = service.search_contacts("100%", None, 10).await.unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.num_pages, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn hidden_contact_detail_is_not_found(db: PgPool) {
        let owner_id = owner(&db).await;
        let service = ContactsService::new(db);
        let (beatriz, _, ana) = seed_directory(&service, owner_id).await;

        assert_eq!(service.get_contact(beatriz.id).await.unwrap().contact.id, beatriz.id);
        assert!(matches!(
            service.get_contact(ana.id).await,
            Err(AppError::ContactNotFound)
        ));
        assert_eq!(service.get_owned_contact(owner_id, ana.id).await.unwrap().id, ana.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn owner_hides_and_restores_a_contact(db: PgPool) {
        let owner_id = owner(&db).await;
        let service = ContactsService::new(db);
        let contact = service
            .create_contact(owner_id, form("Dora", "Vieira", "123", None))
            .await
            .unwrap();

        let updated = service
            .update_contact(owner_id, contact.id, hidden(form("Dora", "Vieira", "123", None)))
            .await
            .unwrap();
        assert!(!updated.show);
        assert!(matches!(
            service.get_contact(contact.id).await,
            Err(AppError::ContactNotFound)
        ));

        // Omitting the flag keeps the contact hidden
        let updated = service
            .update_contact(owner_id, contact.id, form("Dora", "Vieira", "456", None))
            .await
            .unwrap();
        assert!(!updated.show);
        assert_eq!(updated.phone, "456");

        let mut restore = form("Dora", "Vieira", "456", None);
        restore.show = Some(true);
        service.update_contact(owner_id, contact.id, restore).await.unwrap();
        assert!(service.get_contact(contact.id).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn other_owners_cannot_hide_a_contact(db: PgPool) {
        let owner_id = owner(&db).await;
        let stranger = owner(&db).await;
        let service = ContactsService::new(db);
        let contact = service
            .create_contact(owner_id, form("Dora", "Vieira", "123", None))
            .await
            .unwrap();

        assert!(matches!(
            service
                .update_contact(stranger, contact.id, hidden(form("Dora", "Vieira", "123", None)))
                .await,
            Err(AppError::ContactNotFound)
        ));
        assert!(service.get_contact(contact.id).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn third_page_holds_the_remainder(db: PgPool) {
        let owner_id = owner(&db).await;
        let service = ContactsService::new(db);
        for i in 0..25 {
            service
                .create_contact(owner_id, form(&format!("First{}", i), "Last", "1", None))
                .await
                .unwrap();
        }

        let page = service.list_contacts(Some("3"), 10).await.unwrap();
        assert_eq!(page.number, 3);
        assert_eq!(page.items.len(), 5);
        assert!(!page.has_next);

        let page = service.list_contacts(Some("99"), 10).await.unwrap();
        assert_eq!(page.number, 3);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn listing_only_reads_visible_rows() {
        let query = visible_contacts("*", None);
        assert_eq!(query.sql(), "SELECT * FROM contacts WHERE show = true");
    }

    #[test]
    fn search_matches_any_of_four_columns() {
        let query = visible_contacts("COUNT(*)", Some("%ana%"));
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM contacts WHERE show = true AND (first_name ILIKE $1 OR last_name ILIKE $2 OR phone ILIKE $3 OR email ILIKE $4)"
        );
    }
}
