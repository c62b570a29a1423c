//! Builds the joined (user, title, rating) table from the MovieLens-style
//! `ratings.csv` and `movies.csv` files.

use crate::error::{RecommenderError, Result};
use crate::models::{JoinedRating, MovieRecord, RatingRecord};
use crate::utils::validation::validate_joined_rating;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Reads at most `max_rows` data rows from a `userId,movieId,rating,timestamp`
/// file.
pub fn load_ratings(path: impl AsRef<Path>, max_rows: usize) -> Result<Vec<RatingRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| RecommenderError::data_access(path, e))?;

    let mut ratings = Vec::new();
    for result in reader.deserialize().take(max_rows) {
        let record: RatingRecord = result.map_err(|e| RecommenderError::data_access(path, e))?;
        ratings.push(record);
    }

    info!("Loaded {} ratings from {}", ratings.len(), path.display());
    Ok(ratings)
}

/// Reads a `movieId,title,genres` file keyed by movie id.
pub fn load_movies(path: impl AsRef<Path>) -> Result<HashMap<i64, MovieRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| RecommenderError::data_access(path, e))?;

    let mut movies = HashMap::new();
    for result in reader.deserialize() {
        let movie: MovieRecord = result.map_err(|e| RecommenderError::data_access(path, e))?;
        movies.insert(movie.movie_id, movie);
    }

    info!("Loaded {} movies from {}", movies.len(), path.display());
    Ok(movies)
}

/// Inner join on movie id. Ratings without a matching movie are dropped;
/// the ratings' order is preserved.
pub fn join_ratings(ratings: &[RatingRecord], movies: &HashMap<i64, MovieRecord>) -> Vec<JoinedRating> {
    let joined: Vec<JoinedRating> = ratings
        .iter()
        .filter_map(|rating| {
            movies.get(&rating.movie_id).map(|movie| JoinedRating {
                user_id: rating.user_id,
                title: movie.title.clone(),
                rating: rating.rating,
            })
        })
        .collect();

    let dropped = ratings.len() - joined.len();
    if dropped > 0 {
        warn!("Dropped {} ratings with no matching movie", dropped);
    }
    joined
}

pub fn create_user_item_table(
    ratings_path: impl AsRef<Path>,
    movies_path: impl AsRef<Path>,
    max_rows: usize,
) -> Result<Vec<JoinedRating>> {
    let ratings = load_ratings(ratings_path.as_ref(), max_rows)?;
    let movies = load_movies(movies_path.as_ref())?;
    let joined = join_ratings(&ratings, &movies);

    for row in &joined {
        validate_joined_rating(row).map_err(|e| RecommenderError::data_access(ratings_path.as_ref(), e))?;
    }

    Ok(joined)
}

/// Caches the joined table as `userId,title,rating`.
pub fn write_joined_csv(path: impl AsRef<Path>, rows: &[JoinedRating]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RecommenderError::Persistence(format!("{}: {}", parent.display(), e)))?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;
    }
    writer
        .flush()
        .map_err(|e| RecommenderError::Persistence(format!("{}: {}", path.display(), e)))?;

    info!("Wrote {} joined ratings to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_joined_csv(path: impl AsRef<Path>) -> Result<Vec<JoinedRating>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| RecommenderError::data_access(path, e))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: JoinedRating = result.map_err(|e| RecommenderError::data_access(path, e))?;
        validate_joined_rating(&row).map_err(|e| RecommenderError::data_access(path, e))?;
        rows.push(row);
    }

    info!("Read {} joined ratings from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const RATINGS: &str = "userId,movieId,rating,timestamp\n\
        1,1,4.0,964982703\n\
        1,3,4.0,964981247\n\
        2,1,5.0,964982224\n\
        2,99,3.0,964983815\n\
        3,2,2.5,964982931\n";

    const MOVIES: &str = "movieId,title,genres\n\
        1,Toy Story (1995),Adventure|Animation|Children\n\
        2,Jumanji (1995),Adventure|Children|Fantasy\n\
        3,\"American President, The (1995)\",Comedy|Drama|Romance\n";

    #[test]
    fn test_load_ratings_respects_row_limit() {
        let file = csv_file(RATINGS);
        let ratings = load_ratings(file.path(), 2).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[1].movie_id, 3);
    }

    #[test]
    fn test_join_drops_unmatched_movies() {
        let ratings_file = csv_file(RATINGS);
        let movies_file = csv_file(MOVIES);

        let movies = load_movies(movies_file.path()).unwrap();
        let joined = create_user_item_table(ratings_file.path(), movies_file.path(), 100).unwrap();

        assert_eq!(joined.len(), 4);
        assert!(joined.iter().all(|row| movies.values().any(|m| m.title == row.title)));
        assert_eq!(joined[1].title, "American President, The (1995)");
        assert!(!joined.iter().any(|row| row.user_id == 2 && row.rating == 3.0));
    }

    #[test]
    fn test_missing_file_is_data_access_error() {
        let err = load_movies("/nonexistent/movies.csv").unwrap_err();
        assert!(matches!(err, RecommenderError::DataAccess { .. }));
    }

    #[test]
    fn test_malformed_rating_is_data_access_error() {
        let file = csv_file("userId,movieId,rating,timestamp\n1,1,not-a-number,0\n");
        assert!(matches!(
            load_ratings(file.path(), 10),
            Err(RecommenderError::DataAccess { .. })
        ));
    }

    #[test]
    fn test_joined_csv_cache() {
        let ratings_file = csv_file(RATINGS);
        let movies_file = csv_file(MOVIES);
        let joined = create_user_item_table(ratings_file.path(), movies_file.path(), 100).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache/user_item_matrix.csv");
        write_joined_csv(&cache, &joined).unwrap();

        let header = std::fs::read_to_string(&cache).unwrap();
        assert!(header.starts_with("userId,title,rating\n"));
        assert_eq!(read_joined_csv(&cache).unwrap(), joined);
    }
}
