//! Bundled exercise catalogue for the Books & Movies sample dataset.

use drill_core::model::{Exercise, ExerciseError, ExerciseId, Solution};

struct Entry {
    title: &'static str,
    prompt: &'static str,
    relation: &'static str,
    sql: &'static str,
}

const BOOKS_AND_MOVIES: &[Entry] = &[
    Entry {
        title: "Books by year",
        prompt: "List all book titles and their years (ORDER BY year ASC).",
        relation: "books",
        sql: "SELECT title, year FROM books ORDER BY year ASC;",
    },
    Entry {
        title: "Sci-Fi movies",
        prompt: "Movies with genre='Sci-Fi' (title, year).",
        relation: "movies",
        sql: "SELECT title, year FROM movies WHERE genre = 'Sci-Fi';",
    },
    Entry {
        title: "Top rated books",
        prompt: "Books with rating >= 4.5 (title, author_id, rating) ORDER BY rating DESC.",
        relation: "books",
        sql: "SELECT title, author_id, rating FROM books WHERE rating >= 4.5 ORDER BY rating DESC;",
    },
    Entry {
        title: "Movies 2015 to 2021",
        prompt: "Movies released BETWEEN 2015 AND 2021 (title, year, director_id).",
        relation: "movies",
        sql: "SELECT title, year, director_id FROM movies WHERE year BETWEEN 2015 AND 2021;",
    },
    Entry {
        title: "Mid-length books",
        prompt: "Books pages BETWEEN 250 AND 400 AND rating > 4.0 (title, pages, rating).",
        relation: "books",
        sql: "SELECT title, pages, rating FROM books WHERE pages BETWEEN 250 AND 400 AND rating > 4.0;",
    },
    Entry {
        title: "Top 5 movies",
        prompt: "Top 5 highest-rated movies (title, rating) ORDER BY rating DESC LIMIT 5.",
        relation: "movies",
        sql: "SELECT title, rating FROM movies ORDER BY rating DESC LIMIT 5;",
    },
    Entry {
        title: "Drama or romance",
        prompt: "Books where genre='Drama' OR 'Romance' (title, genre, year).",
        relation: "books",
        sql: "SELECT title, genre, year FROM books WHERE genre = 'Drama' OR genre = 'Romance';",
    },
    Entry {
        title: "Good mysteries and thrillers",
        prompt: "Movies where (genre='Mystery' OR 'Thriller') AND rating >= 7.0 (title, genre, rating).",
        relation: "movies",
        sql: "SELECT title, genre, rating FROM movies WHERE (genre = 'Mystery' OR genre = 'Thriller') AND rating >= 7.0;",
    },
    Entry {
        title: "Books before 2010",
        prompt: "Books before 2010 (title, year) ORDER BY year DESC.",
        relation: "books",
        sql: "SELECT title, year FROM books WHERE year < 2010 ORDER BY year DESC;",
    },
    Entry {
        title: "Feature length",
        prompt: "Movies with duration BETWEEN 100 AND 130 (title, duration_minutes, genre).",
        relation: "movies",
        sql: "SELECT title, duration_minutes, genre FROM movies WHERE duration_minutes BETWEEN 100 AND 130;",
    },
    Entry {
        title: "Most recent books",
        prompt: "3 most recent books (title, year) LIMIT 3.",
        relation: "books",
        sql: "SELECT title, year FROM books ORDER BY year DESC LIMIT 3;",
    },
    Entry {
        title: "Low rated or short",
        prompt: "Books with rating < 4.0 OR pages < 250 (title, rating, pages).",
        relation: "books",
        sql: "SELECT title, rating, pages FROM books WHERE rating < 4.0 OR pages < 250;",
    },
    Entry {
        title: "Movies of 2019 and 2020",
        prompt: "Movies where year IN (2019, 2020) (title, year, rating).",
        relation: "movies",
        sql: "SELECT title, year, rating FROM movies WHERE year IN (2019, 2020);",
    },
    Entry {
        title: "Selected authors",
        prompt: "Books with author_id IN (1,3,5) AND rating >= 4.0.",
        relation: "books",
        sql: "SELECT * FROM books WHERE author_id IN (1, 3, 5) AND rating >= 4.0;",
    },
    Entry {
        title: "Movies by genre",
        prompt: "All movies ORDER BY genre ASC, rating DESC.",
        relation: "movies",
        sql: "SELECT * FROM movies ORDER BY genre ASC, rating DESC;",
    },
    Entry {
        title: "Books with authors",
        prompt: "List all book titles with the author name and country.",
        relation: "books",
        sql: "SELECT b.title, a.name AS author_name, a.country\nFROM books b\nJOIN authors a ON a.id = b.author_id;",
    },
    Entry {
        title: "Movies with directors",
        prompt: "Show all movies with their director name, including movies with no matching director (LEFT JOIN).",
        relation: "movies",
        sql: "SELECT m.title, d.name AS director_name\nFROM movies m\nLEFT JOIN directors d ON d.id = m.director_id;",
    },
    Entry {
        title: "Books per author",
        prompt: "For each author, show the number of books (include authors with zero).",
        relation: "authors",
        sql: "SELECT a.name, COUNT(b.id) AS total_books\nFROM authors a\nLEFT JOIN books b ON b.author_id = a.id\nGROUP BY a.name;",
    },
    Entry {
        title: "Director ratings",
        prompt: "For each director, show the average rating of their movies (only where at least one movie exists).",
        relation: "directors",
        sql: "SELECT d.name, AVG(m.rating) AS avg_rating\nFROM directors d\nJOIN movies m ON m.director_id = d.id\nGROUP BY d.name;",
    },
    Entry {
        title: "Authors and directors by country",
        prompt: "By country, show counts of authors and directors (simulate FULL JOIN).",
        relation: "authors",
        sql: "-- FULL JOIN simulation by country (SQLite-compatible)
WITH a AS (
  SELECT country, COUNT(*) AS total_authors FROM authors GROUP BY country
),
d AS (
  SELECT country, COUNT(*) AS total_directors FROM directors GROUP BY country
),
all_c AS (
  SELECT country FROM a
  UNION
  SELECT country FROM d
)
SELECT all_c.country,
       COALESCE(a.total_authors, 0) AS total_authors,
       COALESCE(d.total_directors, 0) AS total_directors
FROM all_c
LEFT JOIN a ON a.country = all_c.country
LEFT JOIN d ON d.country = all_c.country
ORDER BY all_c.country;",
    },
];

/// The twenty Books & Movies exercises, numbered from 1.
///
/// # Errors
///
/// Returns `ExerciseError` if a catalogue entry is malformed.
pub fn books_and_movies() -> Result<Vec<Exercise>, ExerciseError> {
    BOOKS_AND_MOVIES
        .iter()
        .zip(1u32..)
        .map(|(entry, id)| {
            Exercise::new(
                ExerciseId::new(id),
                entry.title,
                entry.prompt,
                entry.relation,
                Solution::query(entry.sql),
            )
        })
        .collect()
}
