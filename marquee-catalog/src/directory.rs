use marquee_core::{CoreError, CoreResult, Movie, Session, SessionRemote};
use marquee_shared::{MovieId, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Default)]
struct DirectoryState {
    sessions: HashMap<SessionId, Session>,
    movies: Vec<Movie>,
    selected_session: Option<SessionId>,
    selected_movie: Option<MovieId>,
}

/// Last-known sessions and movies, plus what the patron is looking at.
///
/// Session reads always go to the service; the local copy only feeds
/// synchronous checks such as pre-flight validation of a booking.
pub struct SessionDirectory {
    remote: Arc<dyn SessionRemote>,
    state: RwLock<DirectoryState>,
}

impl SessionDirectory {
    pub fn new(remote: Arc<dyn SessionRemote>) -> Self {
        Self {
            remote,
            state: RwLock::new(DirectoryState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch the session from the service and remember it.
    pub async fn resolve_session(&self, id: &SessionId) -> CoreResult<Session> {
        match self.remote.fetch_session(id).await {
            Ok(session) => {
                self.upsert_session(session.clone());
                Ok(session)
            }
            Err(e) if e.is_missing() => {
                self.write().sessions.remove(id);
                Err(CoreError::NotFound(format!("session {}", id)))
            }
            Err(e) => Err(e),
        }
    }

    pub fn cached_session(&self, id: &SessionId) -> Option<Session> {
        self.read().sessions.get(id).cloned()
    }

    pub fn upsert_session(&self, session: Session) {
        debug!(
            "Session {} cached with {} of {} seats available",
            session.id, session.available_seats, session.total_seats
        );
        self.write().sessions.insert(session.id.clone(), session);
    }

    /// Reload the session list, for one movie or for all of them.
    pub async fn refresh_sessions(&self, movie: Option<&MovieId>) -> CoreResult<Vec<Session>> {
        let sessions = self.remote.list_sessions(movie).await?;
        let mut state = self.write();
        for session in &sessions {
            state.sessions.insert(session.id.clone(), session.clone());
        }
        info!("Loaded {} sessions", sessions.len());
        Ok(sessions)
    }

    /// Cached sessions of a movie, ordered by date and time.
    pub fn sessions_for_movie(&self, movie: &MovieId) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .read()
            .sessions
            .values()
            .filter(|s| s.movie.id() == movie)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
        sessions
    }

    pub async fn list_movies(&self) -> CoreResult<Vec<Movie>> {
        let movies = self.remote.list_movies().await?;
        self.write().movies = movies.clone();
        info!("Loaded {} movies", movies.len());
        Ok(movies)
    }

    pub fn cached_movies(&self) -> Vec<Movie> {
        self.read().movies.clone()
    }

    pub async fn resolve_movie(&self, id: &MovieId) -> CoreResult<Movie> {
        match self.remote.fetch_movie(id).await {
            Ok(movie) => {
                let mut state = self.write();
                state.movies.retain(|m| &m.id != id);
                state.movies.push(movie.clone());
                Ok(movie)
            }
            Err(e) if e.is_missing() => Err(CoreError::NotFound(format!("movie {}", id))),
            Err(e) => Err(e),
        }
    }

    pub fn select_session(&self, id: SessionId) {
        self.write().selected_session = Some(id);
    }

    /// The focused session, if it is still known locally.
    pub fn selected_session(&self) -> Option<Session> {
        let state = self.read();
        state
            .selected_session
            .as_ref()
            .and_then(|id| state.sessions.get(id))
            .cloned()
    }

    pub fn select_movie(&self, id: MovieId) {
        self.write().selected_movie = Some(id);
    }

    pub fn selected_movie(&self) -> Option<Movie> {
        let state = self.read();
        state
            .selected_movie
            .as_ref()
            .and_then(|id| state.movies.iter().find(|m| &m.id == id))
            .cloned()
    }

    pub fn clear_selection(&self) {
        let mut state = self.write();
        state.selected_session = None;
        state.selected_movie = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::mock::{fixtures, MockCinemaRemote};

    async fn directory() -> (Arc<MockCinemaRemote>, SessionDirectory) {
        let remote = Arc::new(MockCinemaRemote::new());
        remote.add_movie(fixtures::movie(1, "Dune")).await;
        remote.add_session(fixtures::session(7, 20, 12, "5.00")).await;
        let directory = SessionDirectory::new(remote.clone());
        (remote, directory)
    }

    #[tokio::test]
    async fn test_resolve_session_reads_remote_every_time() {
        let (remote, directory) = directory().await;
        let id = SessionId::from(7);
        assert!(directory.cached_session(&id).is_none());

        let first = directory.resolve_session(&id).await.unwrap();
        assert_eq!(first.available_seats, 12);

        let mut updated = fixtures::session(7, 20, 4, "5.00");
        updated.room = "2".into();
        remote.add_session(updated).await;

        let second = directory.resolve_session(&id).await.unwrap();
        assert_eq!(second.available_seats, 4);
        assert_eq!(directory.cached_session(&id).unwrap().room, "2");
        assert_eq!(remote.calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (_remote, directory) = directory().await;
        let err = directory.resolve_session(&SessionId::from(99)).await.unwrap_err();
        assert_eq!(err, CoreError::NotFound("session 99".into()));
    }

    #[tokio::test]
    async fn test_remote_failure_is_propagated() {
        let (remote, directory) = directory().await;
        remote.fail_next(500).await;
        let err = directory.resolve_session(&SessionId::from(7)).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_refresh_and_filter_by_movie() {
        let (remote, directory) = directory().await;
        let mut other = fixtures::session(8, 30, 30, "6.50");
        other.movie = marquee_core::MovieRef::Id(MovieId::from(2));
        remote.add_session(other).await;

        let all = directory.refresh_sessions(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let dune = directory.sessions_for_movie(&MovieId::from(1));
        assert_eq!(dune.len(), 1);
        assert_eq!(dune[0].id, SessionId::from(7));
    }

    #[tokio::test]
    async fn test_selection_focus() {
        let (_remote, directory) = directory().await;
        directory.list_movies().await.unwrap();
        directory.resolve_session(&SessionId::from(7)).await.unwrap();

        directory.select_session(SessionId::from(7));
        directory.select_movie(MovieId::from(1));
        assert_eq!(directory.selected_session().unwrap().id, SessionId::from(7));
        assert_eq!(directory.selected_movie().unwrap().title, "Dune");

        directory.clear_selection();
        assert!(directory.selected_session().is_none());
        assert!(directory.selected_movie().is_none());
    }

    #[tokio::test]
    async fn test_resolve_movie() {
        let (_remote, directory) = directory().await;
        let movie = directory.resolve_movie(&MovieId::from(1)).await.unwrap();
        assert_eq!(movie.title, "Dune");
        assert_eq!(directory.cached_movies().len(), 1);
        assert!(directory.resolve_movie(&MovieId::from(5)).await.unwrap_err().is_missing());
    }
}
