//! Online user table for the UDP server.
//!
//! A session binds a socket address to a user id once the client has entered
//! the lobby or reconnected. Anything heard from the address keeps it alive;
//! silent sessions expire. Expiry only drops the address mapping, the user's
//! room seat survives so they can reconnect.

use log::info;
use shared::UserId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Session {
    pub user: UserId,
    pub addr: SocketAddr,
    pub last_seen: Instant,
}

impl Session {
    pub fn new(user: UserId, addr: SocketAddr) -> Self {
        Self {
            user,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

pub struct SessionManager {
    sessions: HashMap<SocketAddr, Session>,
    max_sessions: usize,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize, timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions,
            timeout,
        }
    }

    /// Binds `user` to `addr`, replacing any older address the user had.
    /// Returns false when the server is full.
    pub fn bind(&mut self, addr: SocketAddr, user: &str) -> bool {
        if let Some(old) = self.addr_of(user) {
            if old != addr {
                self.sessions.remove(&old);
            }
        }
        if let Some(session) = self.sessions.get_mut(&addr) {
            session.user = user.to_string();
            session.last_seen = Instant::now();
            return true;
        }
        if self.sessions.len() >= self.max_sessions {
            return false;
        }
        info!("{} online from {}", user, addr);
        self.sessions.insert(addr, Session::new(user.to_string(), addr));
        true
    }

    pub fn touch(&mut self, addr: SocketAddr) -> bool {
        if let Some(session) = self.sessions.get_mut(&addr) {
            session.last_seen = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn user_of(&self, addr: SocketAddr) -> Option<UserId> {
        self.sessions.get(&addr).map(|session| session.user.clone())
    }

    pub fn addr_of(&self, user: &str) -> Option<SocketAddr> {
        self.sessions
            .values()
            .find(|session| session.user == user)
            .map(|session| session.addr)
    }

    pub fn remove(&mut self, addr: SocketAddr) -> Option<UserId> {
        let session = self.sessions.remove(&addr)?;
        info!("{} went offline", session.user);
        Some(session.user)
    }

    pub fn check_timeouts(&mut self) -> Vec<UserId> {
        let timeout = self.timeout;
        let expired: Vec<SocketAddr> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.addr)
            .collect();

        expired
            .into_iter()
            .filter_map(|addr| self.remove(addr))
            .collect()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut sessions = SessionManager::new(4, Duration::from_secs(60));
        assert!(sessions.bind(test_addr(), "alice"));
        assert_eq!(sessions.user_of(test_addr()), Some("alice".to_string()));
        assert_eq!(sessions.addr_of("alice"), Some(test_addr()));
        assert_eq!(sessions.user_of(test_addr2()), None);
    }

    #[test]
    fn test_rebinding_moves_user_to_new_addr() {
        let mut sessions = SessionManager::new(4, Duration::from_secs(60));
        sessions.bind(test_addr(), "alice");
        sessions.bind(test_addr2(), "alice");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.addr_of("alice"), Some(test_addr2()));
    }

    #[test]
    fn test_capacity_limit() {
        let mut sessions = SessionManager::new(1, Duration::from_secs(60));
        assert!(sessions.bind(test_addr(), "alice"));
        assert!(!sessions.bind(test_addr2(), "bob"));
        // Rebinding an existing address is always allowed.
        assert!(sessions.bind(test_addr(), "carol"));
        assert_eq!(sessions.user_of(test_addr()), Some("carol".to_string()));
    }

    #[test]
    fn test_timeouts_expire_silent_sessions() {
        let mut sessions = SessionManager::new(4, Duration::from_secs(1));
        sessions.bind(test_addr(), "alice");
        sessions.bind(test_addr2(), "bob");
        if let Some(session) = sessions.sessions.get_mut(&test_addr()) {
            session.last_seen = Instant::now() - Duration::from_secs(2);
        }

        let expired = sessions.check_timeouts();
        assert_eq!(expired, vec!["alice".to_string()]);
        assert_eq!(sessions.len(), 1);
        assert!(sessions.touch(test_addr2()));
        assert!(!sessions.touch(test_addr()));
    }

    #[test]
    fn test_remove() {
        let mut sessions = SessionManager::new(4, Duration::from_secs(60));
        sessions.bind(test_addr(), "alice");
        assert_eq!(sessions.remove(test_addr()), Some("alice".to_string()));
        assert_eq!(sessions.remove(test_addr()), None);
        assert!(sessions.is_empty());
    }
}
