//! SQL for the SQLite store: tables, indexes, and the set-based
//! availability query.

/// Stored in `metadata` under `schema_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

pub(super) const CREATE_TABLES: &str = r"
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sales_managers (
        id INTEGER PRIMARY KEY NOT NULL,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sales_manager_languages (
        sales_manager_id INTEGER NOT NULL REFERENCES sales_managers(id),
        value TEXT NOT NULL,
        PRIMARY KEY (sales_manager_id, value)
    );
    CREATE TABLE IF NOT EXISTS sales_manager_products (
        sales_manager_id INTEGER NOT NULL REFERENCES sales_managers(id),
        value TEXT NOT NULL,
        PRIMARY KEY (sales_manager_id, value)
    );
    CREATE TABLE IF NOT EXISTS sales_manager_ratings (
        sales_manager_id INTEGER NOT NULL REFERENCES sales_managers(id),
        value TEXT NOT NULL,
        PRIMARY KEY (sales_manager_id, value)
    );
    CREATE TABLE IF NOT EXISTS slots (
        id INTEGER PRIMARY KEY NOT NULL,
        sales_manager_id INTEGER NOT NULL REFERENCES sales_managers(id),
        start_ms INTEGER NOT NULL,
        end_ms INTEGER NOT NULL,
        booked INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_slots_booking ON slots(sales_manager_id, start_ms, booked);
    CREATE INDEX IF NOT EXISTS idx_slots_start ON slots(start_ms);
";

pub(super) const SELECT_SCHEMA_VERSION: &str = "SELECT value FROM metadata WHERE key = 'schema_version'";

pub(super) const INSERT_SCHEMA_VERSION: &str =
    "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)";

/// Attribute tables, one row per set member.
pub(super) const LANGUAGES_TABLE: &str = "sales_manager_languages";
pub(super) const PRODUCTS_TABLE: &str = "sales_manager_products";
pub(super) const RATINGS_TABLE: &str = "sales_manager_ratings";

pub(super) const INSERT_SALES_MANAGER: &str =
    "INSERT OR REPLACE INTO sales_managers (id, name) VALUES (?1, ?2)";

pub(super) const DELETE_SALES_MANAGER: &str = "DELETE FROM sales_managers WHERE id = ?1";

pub(super) const DELETE_SLOTS_OF_MANAGER: &str = "DELETE FROM slots WHERE sales_manager_id = ?1";

pub(super) const INSERT_SLOT: &str = r"
    INSERT OR REPLACE INTO slots (id, sales_manager_id, start_ms, end_ms, booked)
    VALUES (?1, ?2, ?3, ?4, ?5)
";

pub(super) const DELETE_SLOT: &str = "DELETE FROM slots WHERE id = ?1";

pub(super) const SELECT_ALL_MANAGERS: &str = "SELECT id, name FROM sales_managers ORDER BY id";

/// Directory lookup: language and rating must match, products only need to
/// intersect (`?3` is a JSON array of product names).
pub(super) const SELECT_MANAGERS_BY_CRITERIA: &str = r"
    SELECT m.id, m.name
    FROM sales_managers m
    WHERE EXISTS (
            SELECT 1 FROM sales_manager_languages l
            WHERE l.sales_manager_id = m.id AND l.value = ?1)
      AND EXISTS (
            SELECT 1 FROM sales_manager_ratings r
            WHERE r.sales_manager_id = m.id AND r.value = ?2)
      AND EXISTS (
            SELECT 1 FROM sales_manager_products p, json_each(?3) req
            WHERE p.sales_manager_id = m.id AND p.value = req.value)
    ORDER BY m.id
";

/// `?1`/`?2` day window, `?3` JSON array of manager ids.
pub(super) const SELECT_SLOTS_FOR_DAY: &str = r"
    SELECT id, sales_manager_id, start_ms, end_ms, booked
    FROM slots
    WHERE start_ms >= ?1 AND start_ms < ?2
      AND sales_manager_id IN (SELECT value FROM json_each(?3))
    ORDER BY start_ms ASC, id ASC
";

pub(super) const SELECT_UNBOOKED_SLOTS_FOR_DAY: &str = r"
    SELECT id, sales_manager_id, start_ms, end_ms, booked
    FROM slots
    WHERE start_ms >= ?1 AND start_ms < ?2
      AND booked = 0
      AND sales_manager_id IN (SELECT value FROM json_each(?3))
    ORDER BY start_ms ASC, id ASC
";

/// Set-based availability.
///
/// Parameters: `?1` day start (ms), `?2` day end (ms, exclusive), `?3` language,
/// `?4` rating, `?5` JSON array of required products.
///
/// A manager is eligible when at least one product is required and none of
/// them is missing from its products. Candidate instants are the distinct starts of every slot (booked
/// or not) of eligible managers on the day. A manager counts at an instant
/// when it has an unbooked slot spanning exactly `[t, t + 1h)` and no booked
/// slot on the day with `start < t + 1h AND t < end`.
pub const AVAILABILITY_QUERY: &str = r"
    WITH eligible_managers AS (
        SELECT m.id
        FROM sales_managers m
        WHERE json_array_length(?5) > 0
          AND EXISTS (
                SELECT 1 FROM sales_manager_languages l
                WHERE l.sales_manager_id = m.id AND l.value = ?3)
          AND EXISTS (
                SELECT 1 FROM sales_manager_ratings r
                WHERE r.sales_manager_id = m.id AND r.value = ?4)
          AND NOT EXISTS (
                SELECT 1 FROM json_each(?5) req
                WHERE NOT EXISTS (
                    SELECT 1 FROM sales_manager_products p
                    WHERE p.sales_manager_id = m.id AND p.value = req.value))
    ),
    candidate_starts AS (
        SELECT DISTINCT s.start_ms
        FROM slots s
        JOIN eligible_managers em ON em.id = s.sales_manager_id
        WHERE s.start_ms >= ?1 AND s.start_ms < ?2
    ),
    available_managers AS (
        SELECT c.start_ms, em.id AS manager_id
        FROM candidate_starts c
        CROSS JOIN eligible_managers em
        WHERE EXISTS (
                SELECT 1 FROM slots s
                WHERE s.sales_manager_id = em.id
                  AND s.booked = 0
                  AND s.start_ms = c.start_ms
                  AND s.end_ms = c.start_ms + 3600000)
          AND NOT EXISTS (
                SELECT 1 FROM slots s
                WHERE s.sales_manager_id = em.id
                  AND s.booked = 1
                  AND s.start_ms >= ?1 AND s.start_ms < ?2
                  AND s.start_ms < c.start_ms + 3600000
                  AND c.start_ms < s.end_ms)
    )
    SELECT
        strftime('%Y-%m-%dT%H:%M:%fZ', start_ms / 1000.0, 'unixepoch') AS start_date,
        COUNT(DISTINCT manager_id) AS available_count
    FROM available_managers
    GROUP BY start_ms
    ORDER BY start_ms ASC
";
