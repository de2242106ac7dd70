/*
 *  display/components/mod.rs
 *
 *  platter - now playing, off the shelf
 *  (c) 2020-26 Stuart Hunter
 *
 *  Drawable pieces the frame renderer composes
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod clock;
pub mod gradient;
pub mod now_playing;

pub use clock::ClockBar;
pub use gradient::GradientBar;
pub use now_playing::NowPlayingPanel;
