//! WebRTC screen-share signaling relay.
//!
//! The coordinator never inspects SDP or ICE payloads; it only decides who
//! receives them. Offers originate from the host, answers flow back to a
//! specific peer, and candidates travel in both directions.

use crate::{
    error::EventError,
    protocol::{
        ScreenShareAnswerPayload, ScreenShareIcePayload, ScreenShareOfferPayload, ServerEvent,
    },
};

use super::Coordinator;

impl Coordinator {
    /// Only the host shares its screen. Without a target the offer fans
    /// out to the whole room, which is how a share session starts.
    pub(crate) fn screen_share_offer(
        &mut self,
        conn_id: &str,
        payload: ScreenShareOfferPayload,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, &payload.room_id)?;
        let event = ServerEvent::ScreenShareOffer {
            offer: payload.offer,
            from_user_id: conn_id.to_string(),
        };
        match payload.target_user_id {
            Some(target) => self.relay_to_member(&payload.room_id, &target, &event),
            None => self.broadcast_except(&payload.room_id, conn_id, &event),
        }
        Ok(())
    }

    /// Answers are always directed at the peer whose offer they answer.
    pub(crate) fn screen_share_answer(
        &mut self,
        conn_id: &str,
        payload: ScreenShareAnswerPayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;
        let target = payload.target_user_id.ok_or(EventError::UserNotInRoom)?;
        self.relay_to_member(
            &payload.room_id,
            &target,
            &ServerEvent::ScreenShareAnswer {
                answer: payload.answer,
                from_user_id: conn_id.to_string(),
            },
        );
        Ok(())
    }

    /// Targeted candidates flow between any two members; an untargeted
    /// candidate fans out to the room only when it comes from the host.
    pub(crate) fn screen_share_ice(
        &mut self,
        conn_id: &str,
        payload: ScreenShareIcePayload,
    ) -> Result<(), EventError> {
        self.ensure_member(conn_id, &payload.room_id)?;
        let event = ServerEvent::ScreenShareIceCandidate {
            candidate: payload.candidate,
            from_user_id: conn_id.to_string(),
        };
        match payload.target_user_id {
            Some(target) => self.relay_to_member(&payload.room_id, &target, &event),
            None => {
                let from_host = self
                    .rooms
                    .get(&payload.room_id)
                    .is_some_and(|room| room.is_host(conn_id));
                if from_host {
                    self.broadcast_except(&payload.room_id, conn_id, &event);
                }
            }
        }
        Ok(())
    }

    /// Only the host shares, so only the host ends the share session.
    pub(crate) fn screen_share_end(
        &mut self,
        conn_id: &str,
        room_id: &str,
    ) -> Result<(), EventError> {
        self.ensure_host(conn_id, room_id)?;
        self.broadcast_except(
            room_id,
            conn_id,
            &ServerEvent::ScreenShareEnd {
                from_user_id: conn_id.to_string(),
            },
        );
        Ok(())
    }

    /// Push to a single connection, but only if it is a member of the room.
    fn relay_to_member(&self, room_id: &str, target: &str, event: &ServerEvent) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        if room.is_member(target) {
            self.push_to(target, event);
        }
    }
}
